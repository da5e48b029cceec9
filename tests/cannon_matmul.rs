use cannon::{
    cannon_matmul, distributed_matmul, serial_matmul, CannonWorldBuilder, Kernel, MatMulInput,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_input(n: usize, seed: u64) -> MatMulInput {
    let mut rng = StdRng::seed_from_u64(seed);
    let a: Vec<f64> = (0..n * n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let b: Vec<f64> = (0..n * n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    MatMulInput::new(n, a, b)
}

fn assert_close(c: &[f64], reference: &[f64], tol: f64) {
    assert_eq!(c.len(), reference.len());
    for (i, (x, y)) in c.iter().zip(reference).enumerate() {
        assert!((x - y).abs() <= tol, "element {}: {} != {}", i, x, y);
    }
}

macro_rules! create_test {
    ( $kernel:ident, $num_pes:expr, $n:expr) => {
        paste::paste! {
            #[test]
            #[allow(non_snake_case)]
            fn [<$kernel _ $num_pes _pes_ $n>](){
                let input = random_input($n, ($n * 100 + $num_pes) as u64);
                let c = distributed_matmul($num_pes, Kernel::$kernel, &input).unwrap();
                let reference = serial_matmul(&input).unwrap();
                assert_close(&c, &reference, 1e-7);
            }
        }
    };
}

macro_rules! iter_lens {
    ( $kernel:ident, $num_pes:expr, ($($n:expr),*)) => {
        $(
            create_test!($kernel, $num_pes, $n);
        )*
    };
}

macro_rules! iter_num_pes {
    ( $kernel:ident, ($(($num_pes:expr, $lens:tt)),*)) => {
        $(
            iter_lens!($kernel, $num_pes, $lens);
        )*
    };
}

macro_rules! iter_kernels {
    ( ($($kernel:ident),*), $pes:tt) => {
        $(
            iter_num_pes!($kernel, $pes);
        )*
    };
}

iter_kernels!(
    (Naive, Matrixmultiply),
    ((1, (1, 5, 16)), (4, (2, 8, 14)), (9, (3, 12, 21)), (16, (4, 16, 24)))
);

#[test]
fn identity_times_b_is_b() {
    let n = 4;
    let mut a = vec![0.0; n * n];
    for i in 0..n {
        a[i * n + i] = 1.0;
    }
    let b: Vec<f64> = (0..n * n).map(|x| x as f64 * 1.5 - 7.0).collect();
    let input = MatMulInput::new(n, a, b.clone());
    assert_eq!(b, distributed_matmul(4, Kernel::Naive, &input).unwrap());
}

#[test]
fn row_index_times_col_index() {
    let n = 6;
    let a = (0..n * n).map(|x| (x / n) as f64).collect();
    let b = (0..n * n).map(|x| (x % n) as f64).collect();
    let input = MatMulInput::new(n, a, b);
    let c = distributed_matmul(9, Kernel::Naive, &input).unwrap();
    for i in 0..n {
        for j in 0..n {
            assert_eq!((n * i * j) as f64, c[i * n + j], "c[{}][{}]", i, j);
        }
    }
    assert_eq!(serial_matmul(&input).unwrap(), c);
}

#[test]
fn single_element_blocks() {
    let n = 3;
    let input = MatMulInput::new(
        n,
        (1..=9).map(|x| x as f64).collect(),
        (1..=9).rev().map(|x| x as f64).collect(),
    );
    let c = distributed_matmul(9, Kernel::Naive, &input).unwrap();
    assert_eq!(serial_matmul(&input).unwrap(), c);
}

#[test]
fn one_pe_moves_no_data() {
    let input = MatMulInput::ramp(8, 100.0);
    let results = CannonWorldBuilder::new()
        .with_num_pes(1)
        .with_kernel(Kernel::Naive)
        .launch(|world| (cannon_matmul(world, &input).unwrap(), world.MB_sent()))
        .unwrap();
    let (c, mb_sent) = &results[0];
    assert_eq!(0.0, *mb_sent);
    // one block, one naive multiply-accumulate: same summation order as the serial loop
    assert_eq!(&serial_matmul(&input).unwrap(), c);
}

#[test]
fn one_pe_is_bit_identical_to_serial() {
    for (n, up_to) in [(1, 3.0), (5, 7.5), (9, 123.0), (16, 1000.0)] {
        let input = MatMulInput::ramp(n, up_to);
        let c = distributed_matmul(1, Kernel::Naive, &input).unwrap();
        assert_eq!(serial_matmul(&input).unwrap(), c, "n = {}", n);
    }
}

#[test]
fn every_pe_returns_the_full_product() {
    let input = MatMulInput::ramp(8, 10.0);
    let results = CannonWorldBuilder::new()
        .with_num_pes(4)
        .launch(|world| cannon_matmul(world, &input).unwrap())
        .unwrap();
    assert_eq!(4, results.len());
    for c in &results[1..] {
        assert_eq!(&results[0], c);
    }
    assert_close(&results[0], &serial_matmul(&input).unwrap(), 1e-6);
}

#[test]
fn only_the_coordinator_reads_its_input() {
    let input = MatMulInput::ramp(6, 10.0);
    let empty = MatMulInput::new(6, vec![], vec![]);
    let results = CannonWorldBuilder::new()
        .with_num_pes(9)
        .launch(|world| {
            let mine = if world.my_pe() == 0 { &input } else { &empty };
            cannon_matmul(world, mine).unwrap()
        })
        .unwrap();
    let reference = serial_matmul(&input).unwrap();
    for c in results {
        assert_close(&c, &reference, 1e-9);
    }
}

#[test]
fn repeated_runs_are_identical() {
    let input = random_input(12, 7);
    let first = distributed_matmul(9, Kernel::Matrixmultiply, &input).unwrap();
    let second = distributed_matmul(9, Kernel::Matrixmultiply, &input).unwrap();
    assert_eq!(first, second);
}

#[test]
fn worlds_can_multiply_more_than_once() {
    let first = MatMulInput::ramp(4, 3.0);
    let second = random_input(8, 11);
    let results = CannonWorldBuilder::new()
        .with_num_pes(4)
        .launch(|world| {
            (
                cannon_matmul(world, &first).unwrap(),
                cannon_matmul(world, &second).unwrap(),
            )
        })
        .unwrap();
    for (c1, c2) in results {
        assert_close(&c1, &serial_matmul(&first).unwrap(), 1e-9);
        assert_close(&c2, &serial_matmul(&second).unwrap(), 1e-7);
    }
}
