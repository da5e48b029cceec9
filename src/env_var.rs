use std::sync::OnceLock;

use serde::Deserialize;

use crate::Kernel;

fn default_deadlock_timeout() -> f64 {
    600.0
}

fn default_num_pes() -> usize {
    1
}

fn default_kernel() -> Kernel {
    Kernel::Naive
}

fn default_poll_interval_us() -> u64 {
    100
}

#[derive(Deserialize, Debug)]
pub struct Config {
    /// Seconds a PE may wait on a single receive before a potential deadlock is reported, default: 600.0 seconds
    #[serde(default = "default_deadlock_timeout")]
    pub deadlock_timeout: f64,

    /// The number of PEs launched when a world builder is not given an explicit count, default: 1
    #[serde(default = "default_num_pes")]
    pub num_pes: usize,

    /// The local block kernel
    /// naive -- i-k-j triple loop, default
    /// matrixmultiply -- blocked dgemm from the matrixmultiply crate
    #[serde(default = "default_kernel")]
    pub kernel: Kernel,

    /// How long (in microseconds) a blocked receive sleeps between checks of the abort flag, default: 100
    #[serde(default = "default_poll_interval_us")]
    pub poll_interval_us: u64,

    /// flag used to print warnings when a receive exceeds the deadlock timeout. Default: true
    pub deadlock_warning: Option<bool>,
}

/// Get the current Environment Variable configuration
pub fn config() -> &'static Config {
    static CONFIG: OnceLock<Config> = OnceLock::new();
    CONFIG.get_or_init(|| match envy::prefixed("CANNON_").from_env::<Config>() {
        Ok(config) => config,
        Err(error) => panic!("{}", error),
    })
}
