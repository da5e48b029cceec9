use cannon::{cannon_matmul, config, serial_matmul, CannonWorldBuilder, MatMulInput};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn parse_arg<T: std::str::FromStr>(args: &[String], idx: usize, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match args.get(idx) {
        Some(arg) => arg
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid argument {:?}: {}", arg, e)),
        None => Ok(default),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let n: usize = parse_arg(&args, 1, 12)?;
    let up_to: f64 = parse_arg(&args, 2, 1000.0)?;
    let num_pes = config().num_pes;
    let input = MatMulInput::ramp(n, up_to);

    let timer = Instant::now();
    let results = CannonWorldBuilder::new()
        .with_num_pes(num_pes)
        .launch(|world| (cannon_matmul(world, &input), world.MB_sent()))?;
    let cannon_time = timer.elapsed().as_secs_f64();
    let mb_sent: f64 = results.iter().map(|(_, mb)| mb).sum();
    let mut products = results.into_iter().map(|(res, _)| res);
    let c = match products.next() {
        Some(res) => res?,
        None => anyhow::bail!("no pes were launched"),
    };

    let timer = Instant::now();
    let reference = serial_matmul(&input)?;
    let serial_time = timer.elapsed().as_secs_f64();

    // cannon sums each element in a different order than the serial loop
    let max_abs = |m: &[f64]| m.iter().fold(0.0f64, |acc, x| acc.max(x.abs()));
    let tolerance = 1e-12 * (n as f64 * max_abs(&input.a) * max_abs(&input.b)).max(1.0);
    let mismatches = c
        .iter()
        .zip(&reference)
        .filter(|(x, y)| (*x - *y).abs() > tolerance)
        .count();
    println!(
        "n: {} pes: {} kernel: {:?} cannon: {:.6}s serial: {:.6}s MB sent: {:.3}",
        n,
        num_pes,
        config().kernel,
        cannon_time,
        serial_time,
        mb_sent
    );
    anyhow::ensure!(
        mismatches == 0,
        "{} of {} elements differ from the serial product",
        mismatches,
        n * n
    );
    println!("results match");
    Ok(())
}
