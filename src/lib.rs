//! Guided image labeling with the Phase Stretch Transform.
//!
//! A labeler computes a dense feature mask for a grayscale image once; the
//! resulting mask is then probed point by point to pull out connected regions
//! and refined (speck removal, gap closing). The transform's tuning
//! parameters can be estimated from the image with a small patch predictor.
//!
//! ## Image Format
//! - Labeler input: `(height, width)` u8 grayscale
//! - Estimator input: `(height, width, channels)` u8, channels as the model expects
//! - Masks: `(height, width)` u8, 0/255 for binary masks
//!
//! ## Example
//! ```no_run
//! use autolabel_rust::{PstLabeler, PstParameters};
//! use ndarray::Array2;
//!
//! let image = Array2::<u8>::zeros((64, 64));
//! let mut labeler = PstLabeler::new();
//! labeler.set_params(PstParameters::with_thresholds(20.0, 400.0, 0.1, -1.0, 0.01));
//!
//! let mut result = labeler.apply(image.view())?;
//! let region = result.extract_at(10, 12);
//! result.denoise(20).mask_reconstruction();
//! # Ok::<(), autolabel_rust::LabelError>(())
//! ```

pub mod device;
pub mod error;
pub mod filters;
pub mod guided;
pub mod io;
pub mod nn;
pub mod selection;
pub mod spectral;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use device::Device;
pub use error::{LabelError, Result};
pub use guided::{FeatureLabeler, FeatureResult, LabelerOptions, PstLabeler, PstParameters, PstResult};
pub use nn::{EstimatorMetadata, EstimatorOptions, PatchPredictor, PstParametersEstimator};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use std::path::PathBuf;

    use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2, PyReadonlyArray3};
    use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
    use pyo3::prelude::*;
    use pyo3::types::{PyBool, PyDict, PyFloat, PyIterator, PyList};
    use serde_json::{Map, Value};

    use crate::device::Device;
    use crate::error::LabelError;
    use crate::filters::grayscale::to_gray_u8;
    use crate::guided::{PstLabeler, PstParameters, PstResult};
    use crate::nn::{EstimatorOptions, PstParametersEstimator};

    impl From<LabelError> for PyErr {
        fn from(err: LabelError) -> PyErr {
            match err {
                LabelError::Io(_) | LabelError::ModelArtifact { .. } => PyIOError::new_err(err.to_string()),
                LabelError::ParamsNotSet | LabelError::SamplingExhausted { .. } => {
                    PyRuntimeError::new_err(err.to_string())
                }
                _ => PyValueError::new_err(err.to_string()),
            }
        }
    }

    fn parse_device(device: Option<&str>) -> PyResult<Device> {
        match device {
            Some(name) => Ok(name.parse::<Device>()?),
            None => Ok(Device::detect()),
        }
    }

    // ========================================================================
    // Value Conversion
    // ========================================================================

    fn dict_to_map(dict: &Bound<'_, PyDict>) -> PyResult<Map<String, Value>> {
        let mut map = Map::new();
        for (key, value) in dict.iter() {
            let key: String = key.extract()?;
            // bool before float: Python bools are ints
            let value = if value.is_none() {
                Value::Null
            } else if value.is_instance_of::<PyBool>() {
                Value::Bool(value.extract()?)
            } else {
                Value::from(value.extract::<f64>()?)
            };
            map.insert(key, value);
        }
        Ok(map)
    }

    fn value_to_py<'py>(py: Python<'py>, value: &Value) -> Bound<'py, PyAny> {
        match value {
            Value::Bool(b) => PyBool::new(py, *b).to_owned().into_any(),
            Value::Number(n) => PyFloat::new(py, n.as_f64().unwrap_or(f64::NAN)).into_any(),
            _ => py.None().into_bound(py),
        }
    }

    /// Gray `(H, W)` or `(H, W, C)` uint8 array to a luminance plane.
    fn gray_image(image: &Bound<'_, PyAny>) -> PyResult<ndarray::Array2<u8>> {
        if let Ok(gray) = image.extract::<PyReadonlyArray2<u8>>() {
            return Ok(gray.as_array().to_owned());
        }
        let color: PyReadonlyArray3<u8> = image.extract()?;
        Ok(to_gray_u8(color.as_array())?)
    }

    // ========================================================================
    // PSTParameters
    // ========================================================================

    #[pyclass(name = "PSTParameters", frozen)]
    #[derive(Clone)]
    pub struct PyPstParameters {
        inner: PstParameters,
    }

    #[pymethods]
    impl PyPstParameters {
        #[new]
        #[allow(non_snake_case)]
        #[pyo3(signature = (phase_strength, warp_strength, sigma_LPF, thresh_min=None, thresh_max=None, morph_flag=true))]
        fn new(
            phase_strength: f32,
            warp_strength: f32,
            sigma_LPF: f32,
            thresh_min: Option<f32>,
            thresh_max: Option<f32>,
            morph_flag: bool,
        ) -> PyResult<Self> {
            let inner = PstParameters::new(
                phase_strength,
                warp_strength,
                sigma_LPF,
                thresh_min,
                thresh_max,
                morph_flag,
            )?;
            Ok(Self { inner })
        }

        /// Build from a dict with the field names as keys.
        #[staticmethod]
        fn from_dict(mapping: &Bound<'_, PyDict>) -> PyResult<Self> {
            let inner = PstParameters::from_mapping(dict_to_map(mapping)?)?;
            Ok(Self { inner })
        }

        fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
            let dict = PyDict::new(py);
            for (key, value) in self.inner.iter() {
                dict.set_item(key, value_to_py(py, &value))?;
            }
            Ok(dict)
        }

        fn __iter__<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyIterator>> {
            let values: Vec<Bound<'py, PyAny>> =
                self.inner.iter().map(|(_, v)| value_to_py(py, &v)).collect();
            PyList::new(py, values)?.try_iter()
        }

        #[getter]
        fn phase_strength(&self) -> f32 {
            self.inner.phase_strength()
        }

        #[getter]
        fn warp_strength(&self) -> f32 {
            self.inner.warp_strength()
        }

        #[getter]
        #[allow(non_snake_case)]
        fn sigma_LPF(&self) -> f32 {
            self.inner.sigma_lpf()
        }

        #[getter]
        fn thresh_min(&self) -> Option<f32> {
            self.inner.thresh_min()
        }

        #[getter]
        fn thresh_max(&self) -> Option<f32> {
            self.inner.thresh_max()
        }

        #[getter]
        fn morph_flag(&self) -> bool {
            self.inner.morph_flag()
        }

        fn __eq__(&self, other: &Self) -> bool {
            self.inner == other.inner
        }

        fn __repr__(&self) -> String {
            format!("{:?}", self.inner)
        }
    }

    // ========================================================================
    // PSTResult
    // ========================================================================

    #[pyclass(name = "PSTResult")]
    pub struct PyPstResult {
        inner: PstResult,
    }

    #[pymethods]
    impl PyPstResult {
        #[new]
        fn new(mask: PyReadonlyArray2<'_, u8>) -> Self {
            Self {
                inner: PstResult::new(mask.as_array().to_owned()),
            }
        }

        /// Current mask as a new uint8 array.
        fn edges<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<u8>> {
            self.inner.edges().into_pyarray(py)
        }

        /// Region under column `x`, row `y`; all zero outside the mask.
        fn extract_at<'py>(&self, py: Python<'py>, x: i64, y: i64) -> Bound<'py, PyArray2<u8>> {
            let region = match (usize::try_from(x), usize::try_from(y)) {
                (Ok(x), Ok(y)) => self.inner.extract_at(x, y),
                _ => ndarray::Array2::zeros(self.inner.dim()),
            };
            region.into_pyarray(py)
        }

        #[pyo3(signature = (thresh_px, eps_px=PstResult::DEFAULT_EPS_PX, min_pts=PstResult::DEFAULT_MIN_PTS))]
        fn denoise(
            mut slf: PyRefMut<'_, Self>,
            thresh_px: usize,
            eps_px: f32,
            min_pts: usize,
        ) -> PyRefMut<'_, Self> {
            slf.inner.denoise_with(thresh_px, eps_px, min_pts);
            slf
        }

        #[pyo3(signature = (closing_size=PstResult::DEFAULT_CLOSING_SIZE, median_size=PstResult::DEFAULT_MEDIAN_SIZE))]
        fn mask_reconstruction(
            mut slf: PyRefMut<'_, Self>,
            closing_size: usize,
            median_size: usize,
        ) -> PyRefMut<'_, Self> {
            slf.inner.mask_reconstruction_with(closing_size, median_size);
            slf
        }

        fn copy(&self) -> Self {
            Self {
                inner: self.inner.copy(),
            }
        }

        fn __copy__(&self) -> Self {
            self.copy()
        }

        #[getter]
        fn shape(&self) -> (usize, usize) {
            self.inner.dim()
        }
    }

    // ========================================================================
    // PSTLabeler
    // ========================================================================

    #[pyclass(name = "PSTLabeler")]
    pub struct PyPstLabeler {
        inner: PstLabeler,
    }

    #[pymethods]
    impl PyPstLabeler {
        #[new]
        #[pyo3(signature = (device=None))]
        fn new(device: Option<&str>) -> PyResult<Self> {
            Ok(Self {
                inner: PstLabeler::with_device(parse_device(device)?),
            })
        }

        /// Accepts a `PSTParameters` instance or a dict.
        fn set_params(&mut self, parameters: &Bound<'_, PyAny>) -> PyResult<()> {
            if let Ok(params) = parameters.extract::<PyRef<'_, PyPstParameters>>() {
                self.inner.set_params(params.inner);
                return Ok(());
            }
            let dict: Bound<'_, PyDict> = parameters.extract()?;
            self.inner.set_params_from_mapping(dict_to_map(&dict)?)?;
            Ok(())
        }

        /// Compute the feature mask; with `flag_raw` the unscaled float field is returned.
        #[pyo3(signature = (image, flag_raw=false))]
        fn apply<'py>(
            &mut self,
            py: Python<'py>,
            image: &Bound<'py, PyAny>,
            flag_raw: bool,
        ) -> PyResult<Bound<'py, PyAny>> {
            let gray = gray_image(image)?;
            if flag_raw {
                let field = self.inner.apply_raw(gray.view())?;
                return Ok(field.into_pyarray(py).into_any());
            }
            let result = self.inner.apply(gray.view())?;
            Ok(Bound::new(py, PyPstResult { inner: result })?.into_any())
        }

        #[getter]
        fn device(&self) -> String {
            self.inner.device().to_string()
        }
    }

    // ========================================================================
    // PSTParametersEstimator
    // ========================================================================

    #[pyclass(name = "PSTParametersEstimator")]
    pub struct PyPstParametersEstimator {
        inner: PstParametersEstimator,
    }

    #[pymethods]
    impl PyPstParametersEstimator {
        #[new]
        #[pyo3(signature = (models_dir, model_version=1, seed=None, device=None))]
        fn new(
            models_dir: PathBuf,
            model_version: u32,
            seed: Option<u64>,
            device: Option<&str>,
        ) -> PyResult<Self> {
            let options = EstimatorOptions {
                device: parse_device(device)?,
                seed,
            };
            Ok(Self {
                inner: PstParametersEstimator::load(models_dir, model_version, options)?,
            })
        }

        #[pyo3(signature = (image, mask=None, n_samples=10))]
        fn apply(
            &self,
            image: PyReadonlyArray3<'_, u8>,
            mask: Option<PyReadonlyArray2<'_, u8>>,
            n_samples: usize,
        ) -> PyResult<PyPstParameters> {
            let mask_view = mask.as_ref().map(|m| m.as_array());
            let inner = self.inner.apply(image.as_array(), mask_view, n_samples)?;
            Ok(PyPstParameters { inner })
        }
    }

    /// Python module definition
    #[pymodule]
    pub fn autolabel_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_class::<PyPstParameters>()?;
        m.add_class::<PyPstLabeler>()?;
        m.add_class::<PyPstResult>()?;
        m.add_class::<PyPstParametersEstimator>()?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::autolabel_rust;
