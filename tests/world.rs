use cannon::{CannonWorldBuilder, CommError, LaunchError};

#[test]
fn pes_are_numbered_in_order() {
    let pes = CannonWorldBuilder::new()
        .with_num_pes(5)
        .launch(|world| (world.my_pe(), world.num_pes()))
        .unwrap();
    assert_eq!(vec![(0, 5), (1, 5), (2, 5), (3, 5), (4, 5)], pes);
}

#[test]
fn ring_exchange() {
    let received = CannonWorldBuilder::new()
        .with_num_pes(6)
        .launch(|world| {
            let n = world.num_pes();
            let me = world.my_pe();
            world
                .exchange(&me, (me + 1) % n, (me + n - 1) % n, 7)
                .unwrap()
        })
        .unwrap();
    assert_eq!(vec![5, 0, 1, 2, 3, 4], received);
}

#[test]
fn broadcast_from_any_root() {
    let received = CannonWorldBuilder::new()
        .with_num_pes(4)
        .launch(|world| {
            world
                .broadcast(2, 1, || format!("hello from {}", world.my_pe()))
                .unwrap()
        })
        .unwrap();
    for msg in received {
        assert_eq!("hello from 2", msg);
    }
}

#[test]
fn messages_from_one_pe_keep_their_order() {
    let received = CannonWorldBuilder::new()
        .with_num_pes(2)
        .launch(|world| {
            if world.my_pe() == 0 {
                for i in 0..10u32 {
                    world.send(1, i % 2, &i).unwrap();
                }
                vec![]
            } else {
                let odd: Vec<u32> = (0..5).map(|_| world.recv(0, 1).unwrap()).collect();
                let even: Vec<u32> = (0..5).map(|_| world.recv(0, 0).unwrap()).collect();
                odd.into_iter().chain(even).collect()
            }
        })
        .unwrap();
    assert_eq!(vec![1, 3, 5, 7, 9, 0, 2, 4, 6, 8], received[1]);
}

#[test]
fn repeated_barriers() {
    let counts = CannonWorldBuilder::new()
        .with_num_pes(4)
        .launch(|world| {
            for _ in 0..20 {
                world.barrier().unwrap();
            }
            world.MB_sent()
        })
        .unwrap();
    assert!(counts.iter().all(|mb| *mb > 0.0));
}

#[test]
fn sending_outside_the_world_fails() {
    let res = CannonWorldBuilder::new()
        .with_num_pes(2)
        .launch(|world| world.send(2, 0, &1u8))
        .unwrap();
    for r in res {
        match r {
            Err(CommError::InvalidPe { pe: 2, num_pes: 2 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn a_panicking_pe_aborts_the_rest() {
    let res = CannonWorldBuilder::new()
        .with_num_pes(4)
        .launch(|world| {
            if world.my_pe() == 3 {
                panic!("pe three gave up");
            }
            world.recv::<u64>(3, 0)
        });
    match res {
        Err(LaunchError::PeFailed { pe: 3, msg }) => assert!(msg.contains("pe three gave up")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn zero_pes() {
    match CannonWorldBuilder::new().with_num_pes(0).launch(|_| ()) {
        Err(LaunchError::NoPes) => {}
        other => panic!("unexpected {:?}", other),
    }
}
