use std::sync::Arc;

use pyo3::create_exception;
use pyo3::exceptions::PyException;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::config::{SensorConfig, DEFAULT_TIMEOUT};
use crate::driver::DistanceSensorDriver;
use crate::interrupt::GpiodLines;
use crate::Error;

create_exception!(hcsr04, ConfigurationError, PyException);
create_exception!(hcsr04, TimeoutError, PyException);
create_exception!(hcsr04, HardwareError, PyException);
create_exception!(hcsr04, BusyError, PyException);

impl From<Error> for PyErr {
    fn from(err: Error) -> PyErr {
        let msg = err.to_string();
        match err {
            Error::Configuration(_) => ConfigurationError::new_err(msg),
            Error::Timeout { .. } => TimeoutError::new_err(msg),
            Error::Hardware(_) => HardwareError::new_err(msg),
            Error::Busy => BusyError::new_err(msg),
        }
    }
}

#[pyclass]
#[doc = "HC-SR04 ultrasonic distance sensor.\n\n\
         Pins accept physical header numbers (\"16\"), board constants (\"D23\"),\n\
         kernel names (\"GPIO23\") or bare BCM numbers.\n\
         Distances are in meters."]
struct UltrasonicSensor {
    // None only after a reconfigure whose lines could not be requested
    driver: Option<Arc<DistanceSensorDriver<GpiodLines>>>,
    config: SensorConfig,
}

impl UltrasonicSensor {
    fn open(config: SensorConfig) -> PyResult<Self> {
        let driver = DistanceSensorDriver::new(&config)?;
        Ok(UltrasonicSensor {
            driver: Some(Arc::new(driver)),
            config,
        })
    }

    fn driver(&self) -> PyResult<Arc<DistanceSensorDriver<GpiodLines>>> {
        self.driver
            .clone()
            .ok_or_else(|| HardwareError::new_err("sensor lines are not available"))
    }
}

#[pymethods]
impl UltrasonicSensor {
    #[new]
    #[pyo3(signature = (trigger_pin, echo_interrupt_pin, board=None, timeout_ms=None, gpio_chip=None))]
    fn new(
        trigger_pin: String,
        echo_interrupt_pin: String,
        board: Option<String>,
        timeout_ms: Option<f64>,
        gpio_chip: Option<String>,
    ) -> PyResult<Self> {
        let config = SensorConfig {
            board: board.unwrap_or_else(|| "pi".to_string()),
            trigger_pin,
            echo_interrupt_pin,
            timeout_ms,
            gpio_chip,
        };
        Self::open(config)
    }

    /// Builds a sensor from the host's JSON attribute map.
    #[staticmethod]
    fn from_attributes(attributes: String) -> PyResult<Self> {
        Self::open(SensorConfig::from_json(&attributes)?)
    }

    /// Replaces the driver with one built from new attributes.
    ///
    /// Rejected attributes leave the current driver untouched. If the new
    /// lines cannot be requested the old ones are requested again.
    fn reconfigure(&mut self, attributes: String) -> PyResult<()> {
        let config = SensorConfig::from_json(&attributes)?;
        config.validate()?;

        // The new pins may overlap the old ones
        self.driver = None;
        match DistanceSensorDriver::new(&config) {
            Ok(driver) => {
                self.driver = Some(Arc::new(driver));
                self.config = config;
                Ok(())
            }
            Err(e) => {
                self.driver = DistanceSensorDriver::new(&self.config).ok().map(Arc::new);
                Err(e.into())
            }
        }
    }

    /// Distance in meters. Releases the GIL while measuring.
    fn get_distance(&self, py: Python<'_>) -> PyResult<f64> {
        let driver = self.driver()?;
        Ok(py.allow_threads(move || driver.get_distance())?)
    }

    /// Host sensor reading map: `{"distance": meters}`.
    fn get_readings<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let distance = self.get_distance(py)?;
        let readings = PyDict::new(py);
        readings.set_item("distance", distance)?;
        Ok(readings)
    }

    #[getter]
    fn board(&self) -> String {
        self.config.board.clone()
    }

    #[getter]
    fn trigger_pin(&self) -> String {
        self.config.trigger_pin.clone()
    }

    #[getter]
    fn echo_interrupt_pin(&self) -> String {
        self.config.echo_interrupt_pin.clone()
    }

    #[getter]
    fn timeout_ms(&self) -> f64 {
        self.config
            .timeout_ms
            .unwrap_or(DEFAULT_TIMEOUT.as_secs_f64() * 1000.0)
    }

    #[getter]
    fn state(&self) -> Option<&'static str> {
        self.driver.as_ref().map(|d| d.state().as_str())
    }
}

/// Checks the host's attribute map without touching the hardware.
///
/// Returns the implicit dependencies of the sensor, which is always none.
#[pyfunction]
fn validate_attributes(attributes: String) -> PyResult<Vec<String>> {
    SensorConfig::from_json(&attributes)?.validate()?;
    Ok(Vec::new())
}

// Register the module
#[pymodule]
fn hcsr04(py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<UltrasonicSensor>()?;
    m.add_function(wrap_pyfunction!(validate_attributes, m)?)?;
    m.add("ConfigurationError", py.get_type::<ConfigurationError>())?;
    m.add("TimeoutError", py.get_type::<TimeoutError>())?;
    m.add("HardwareError", py.get_type::<HardwareError>())?;
    m.add("BusyError", py.get_type::<BusyError>())?;
    Ok(())
}
