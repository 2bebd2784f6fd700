use forage_life_core::config::SimConfig;
use forage_life_core::world::World;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn parse_config(config_json: Option<&str>) -> PyResult<SimConfig> {
    match config_json {
        Some(json) => serde_json::from_str(json)
            .map_err(|e| PyValueError::new_err(format!("invalid config json: {e}"))),
        None => Ok(SimConfig::default()),
    }
}

/// Stepping handle over a single world, driven from Python.
#[pyclass(unsendable)]
struct Simulation {
    world: World,
}

#[pymethods]
impl Simulation {
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = parse_config(config_json)?;
        let world = World::try_new(config)
            .map_err(|e| PyValueError::new_err(format!("invalid world configuration: {e}")))?;
        Ok(Self { world })
    }

    /// Advance `n` ticks and return the total wall time spent, in microseconds.
    #[pyo3(signature = (n=1))]
    fn step(&mut self, n: usize) -> u64 {
        (0..n).map(|_| self.world.step().total_us).sum()
    }

    fn request_pulse(&mut self) {
        self.world.request_pulse();
    }

    #[getter]
    fn tick(&self) -> u64 {
        self.world.tick()
    }

    #[getter]
    fn agent_count(&self) -> usize {
        self.world.agent_count()
    }

    fn snapshot_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.world.snapshot())
            .map_err(|e| PyValueError::new_err(format!("failed to serialize snapshot: {e}")))
    }

    /// JSON list of the lifecycle events raised during the most recent tick.
    fn events_json(&self) -> PyResult<String> {
        serde_json::to_string(self.world.events())
            .map_err(|e| PyValueError::new_err(format!("failed to serialize events: {e}")))
    }

    #[pyo3(signature = (steps, sample_every=100))]
    fn run_experiment_json(&mut self, steps: usize, sample_every: usize) -> PyResult<String> {
        let summary = self
            .world
            .try_run_experiment(steps, sample_every)
            .map_err(|e| PyValueError::new_err(format!("invalid experiment parameters: {e}")))?;
        serde_json::to_string(&summary)
            .map_err(|e| PyValueError::new_err(format!("failed to serialize summary: {e}")))
    }
}

#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pyfunction]
fn default_config_json() -> PyResult<String> {
    serde_json::to_string(&SimConfig::default())
        .map_err(|e| PyValueError::new_err(format!("failed to serialize default config: {e}")))
}

#[pyfunction]
fn validate_config_json(config_json: &str) -> PyResult<bool> {
    let config = parse_config(Some(config_json))?;
    config
        .validate()
        .map(|_| true)
        .map_err(|e| PyValueError::new_err(format!("invalid world configuration: {e}")))
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Simulation>()?;
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(default_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(validate_config_json, m)?)?;
    Ok(())
}
