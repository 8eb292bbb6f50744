use crate::errors::{Result, SurrogateError};
use linfa::{Float, ParamGuard};
use ndarray::Array1;
use std::fmt;
use std::iter::successors;
use std::str::FromStr;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Supported Gaussian process backends.
///
/// The set is closed: parsing an unknown name fails instead of falling back
/// to a default backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Backend {
    /// scikit-learn `GaussianProcessRegressor`
    #[default]
    ScikitLearn,
    /// mogp-emulator `GaussianProcess` / `MultiOutputGP`
    Mogp,
}

impl FromStr for Backend {
    type Err = SurrogateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "scikit-learn" => Ok(Backend::ScikitLearn),
            "mogp" => Ok(Backend::Mogp),
            _ => Err(SurrogateError::ConfigurationError(format!(
                "unsupported backend `{s}`, expected `scikit-learn` or `mogp`"
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::ScikitLearn => write!(f, "scikit-learn"),
            Backend::Mogp => write!(f, "mogp"),
        }
    }
}

/// Covariance kernels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Kernel {
    /// Matern kernel, 3/2 with scikit-learn and 5/2 with mogp
    #[default]
    Matern,
    /// Squared exponential (RBF) kernel
    Rbf,
}

impl FromStr for Kernel {
    type Err = SurrogateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "matern" => Ok(Kernel::Matern),
            "rbf" => Ok(Kernel::Rbf),
            _ => Err(SurrogateError::ConfigurationError(format!(
                "unsupported kernel `{s}`, expected `Matern` or `RBF`"
            ))),
        }
    }
}

/// Noise (nugget) handling of the Gaussian process
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Nugget {
    /// Noise level initialized at the given value and optimized around it
    Fixed(f64),
    /// Noise level estimated by the backend
    Fit,
    /// Smallest noise level making the covariance matrix invertible
    Adaptive,
    /// No noise term
    Disabled,
}

impl FromStr for Nugget {
    type Err = SurrogateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fit" => Ok(Nugget::Fit),
            "adaptive" => Ok(Nugget::Adaptive),
            "none" | "false" => Ok(Nugget::Disabled),
            _ => s.parse::<f64>().map(Nugget::Fixed).map_err(|_| {
                SurrogateError::ConfigurationError(format!(
                    "unsupported nugget `{s}`, expected a value, `fit`, `adaptive` or `none`"
                ))
            }),
        }
    }
}

/// Default noise level when the nugget is estimated
pub const DEFAULT_NOISE_LEVEL: f64 = 1e-8;
/// Noise level used by the adaptive nugget
pub const ADAPTIVE_NOISE_LEVEL: f64 = 1e-12;
/// Largest noise level tried by the adaptive nugget
pub const MAX_ADAPTIVE_NOISE_LEVEL: f64 = 1.0;
/// Default number of restarts of the hyperparameters optimizer
pub const DEFAULT_N_RESTARTS: usize = 5;
/// Number of noise levels tried within the bounds of an estimated nugget
pub const N_NOISE_LEVELS: usize = 7;

/// Stationary correlation models, functions of the scaled distance `r`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Correlation {
    /// `exp(-r^2 / 2)`
    SquaredExponential,
    /// `(1 + sqrt(3) r) exp(-sqrt(3) r)`
    Matern32,
    /// `(1 + sqrt(5) r + 5 r^2 / 3) exp(-sqrt(5) r)`
    Matern52,
}

impl Correlation {
    /// Correlation at scaled distance `r >= 0`
    pub fn value<F: Float>(&self, r: F) -> F {
        match self {
            Correlation::SquaredExponential => (-r * r / F::cast(2.)).exp(),
            Correlation::Matern32 => {
                let a = F::cast(3.).sqrt() * r;
                (F::one() + a) * (-a).exp()
            }
            Correlation::Matern52 => {
                let a = F::cast(5.).sqrt() * r;
                (F::one() + a + a * a / F::cast(3.)) * (-a).exp()
            }
        }
    }
}

/// Noise term added to the diagonal of the covariance matrix
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Noise {
    /// No noise term
    Disabled,
    /// Constant noise level
    Fixed(f64),
    /// Noise level estimated within bounds by maximum likelihood
    Fitted {
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },
    /// Smallest noise level, increased tenfold from the given one, making
    /// the covariance matrix positive definite
    Adaptive(f64),
}

impl Noise {
    /// Noise levels tried when fitting, in increasing order
    pub fn levels(&self) -> Vec<f64> {
        match *self {
            Noise::Disabled => vec![0.],
            Noise::Fixed(level) => vec![level],
            Noise::Fitted { lower, upper } => {
                Array1::logspace(10., lower.log10(), upper.log10(), N_NOISE_LEVELS).to_vec()
            }
            Noise::Adaptive(start) => successors(Some(start), |level| Some(level * 10.))
                .take_while(|&level| level <= MAX_ADAPTIVE_NOISE_LEVEL)
                .collect(),
        }
    }

    /// Whether fitting stops at the first level giving a positive definite covariance
    pub fn is_adaptive(&self) -> bool {
        matches!(self, Noise::Adaptive(_))
    }
}

/// A set of validated Gaussian process backend parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct GpValidConfig {
    backend: Backend,
    kernel: Kernel,
    length_scale: f64,
    bias: bool,
    nugget: Nugget,
    n_restarts: usize,
    standardize_x: bool,
    standardize_y: bool,
}

impl Default for GpValidConfig {
    fn default() -> GpValidConfig {
        GpValidConfig {
            backend: Backend::default(),
            kernel: Kernel::default(),
            length_scale: 1.0,
            bias: false,
            nugget: Nugget::Fixed(DEFAULT_NOISE_LEVEL),
            n_restarts: DEFAULT_N_RESTARTS,
            standardize_x: true,
            standardize_y: true,
        }
    }
}

impl GpValidConfig {
    /// Get backend
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Get kernel
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Get initial length scale, shared by all input dimensions
    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    /// Whether a constant (bias) kernel is added
    pub fn bias(&self) -> bool {
        self.bias
    }

    /// Get nugget handling
    pub fn nugget(&self) -> Nugget {
        self.nugget
    }

    /// Get number of optimizer restarts
    pub fn n_restarts(&self) -> usize {
        self.n_restarts
    }

    /// Whether training inputs are standardized
    pub fn standardize_x(&self) -> bool {
        self.standardize_x
    }

    /// Whether training outputs are standardized
    pub fn standardize_y(&self) -> bool {
        self.standardize_y
    }

    /// Correlation model of the kernel
    pub fn correlation(&self) -> Correlation {
        match (self.backend, self.kernel) {
            (_, Kernel::Rbf) => Correlation::SquaredExponential,
            (Backend::ScikitLearn, Kernel::Matern) => Correlation::Matern32,
            (Backend::Mogp, Kernel::Matern) => Correlation::Matern52,
        }
    }

    /// Length scale optimization bounds
    pub fn length_scale_bounds(&self) -> (f64, f64) {
        match (self.backend, self.kernel) {
            (Backend::ScikitLearn, Kernel::Matern) => (1e-5, 1e5),
            _ => (self.length_scale * 1e-4, self.length_scale * 1e4),
        }
    }

    /// Length scales tried when fitting: the initial one, then `n_restarts`
    /// values log-spaced within the bounds
    pub fn length_scales(&self) -> Vec<f64> {
        let (lower, upper) = self.length_scale_bounds();
        let mut scales = vec![self.length_scale];
        if self.n_restarts > 0 {
            scales.extend(Array1::logspace(
                10.,
                lower.log10(),
                upper.log10(),
                self.n_restarts,
            ));
        }
        scales
    }

    /// Noise term of the covariance.
    ///
    /// With scikit-learn a nugget value is the initial level of a noise
    /// estimated within three decades around it, while the adaptive nugget is
    /// a fixed tiny level. With mogp a nugget value is kept fixed and the
    /// adaptive nugget is increased until the covariance is positive definite.
    pub fn noise(&self) -> Noise {
        match (self.backend, self.nugget) {
            (_, Nugget::Disabled) => Noise::Disabled,
            (_, Nugget::Fit) => Noise::Fitted {
                lower: DEFAULT_NOISE_LEVEL * 1e-3,
                upper: DEFAULT_NOISE_LEVEL * 1e3,
            },
            (Backend::ScikitLearn, Nugget::Fixed(level)) => Noise::Fitted {
                lower: level * 1e-3,
                upper: level * 1e3,
            },
            (Backend::Mogp, Nugget::Fixed(level)) => Noise::Fixed(level),
            (Backend::ScikitLearn, Nugget::Adaptive) => Noise::Fixed(ADAPTIVE_NOISE_LEVEL),
            (Backend::Mogp, Nugget::Adaptive) => Noise::Adaptive(ADAPTIVE_NOISE_LEVEL),
        }
    }
}

/// The set of parameters that can be specified to build a Gaussian process surrogate
#[derive(Clone, Debug, Default)]
pub struct GpConfig(GpValidConfig);

impl GpConfig {
    /// Default parameters: scikit-learn backend, Matern kernel, unit length
    /// scale, 1e-8 nugget, standardized inputs and outputs.
    pub fn new() -> GpConfig {
        GpConfig::default()
    }

    /// Set backend
    pub fn backend(mut self, backend: Backend) -> Self {
        self.0.backend = backend;
        self
    }

    /// Set kernel
    pub fn kernel(mut self, kernel: Kernel) -> Self {
        self.0.kernel = kernel;
        self
    }

    /// Set initial length scale
    pub fn length_scale(mut self, length_scale: f64) -> Self {
        self.0.length_scale = length_scale;
        self
    }

    /// Add a constant (bias) kernel, making the model non-stationary
    pub fn bias(mut self, bias: bool) -> Self {
        self.0.bias = bias;
        self
    }

    /// Set nugget handling
    pub fn nugget(mut self, nugget: Nugget) -> Self {
        self.0.nugget = nugget;
        self
    }

    /// Set number of optimizer restarts
    pub fn n_restarts(mut self, n_restarts: usize) -> Self {
        self.0.n_restarts = n_restarts;
        self
    }

    /// Set standardization of training inputs and outputs
    pub fn standardize(mut self, x: bool, y: bool) -> Self {
        self.0.standardize_x = x;
        self.0.standardize_y = y;
        self
    }
}

impl From<GpValidConfig> for GpConfig {
    fn from(valid: GpValidConfig) -> Self {
        GpConfig(valid)
    }
}

impl ParamGuard for GpConfig {
    type Checked = GpValidConfig;
    type Error = SurrogateError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let config = &self.0;
        if !(config.length_scale.is_finite() && config.length_scale > 0.) {
            return Err(SurrogateError::ConfigurationError(format!(
                "length scale must be positive, got {}",
                config.length_scale
            )));
        }
        if let Nugget::Fixed(level) = config.nugget {
            if !(level.is_finite() && level > 0.) {
                return Err(SurrogateError::ConfigurationError(format!(
                    "nugget must be positive, got {level}"
                )));
            }
        }
        if config.backend == Backend::Mogp {
            if config.bias {
                return Err(SurrogateError::ConfigurationError(
                    "non-stationary (bias) kernels are not available with mogp".to_string(),
                ));
            }
            if config.nugget == Nugget::Disabled {
                return Err(SurrogateError::ConfigurationError(
                    "mogp requires a nugget: a value, `fit` or `adaptive`".to_string(),
                ));
            }
        }
        Ok(config)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_backend_closed_set() {
        assert_eq!("scikit-learn".parse::<Backend>().unwrap(), Backend::ScikitLearn);
        assert_eq!("mogp".parse::<Backend>().unwrap(), Backend::Mogp);
        assert!(matches!(
            "adaptive".parse::<Backend>(),
            Err(SurrogateError::ConfigurationError(_))
        ));
        assert_eq!(Backend::Mogp.to_string(), "mogp");
    }

    #[test]
    fn test_correlations() {
        let config = GpConfig::new().kernel("RBF".parse().unwrap()).check().unwrap();
        assert_eq!(config.correlation(), Correlation::SquaredExponential);
        assert_eq!(GpValidConfig::default().correlation(), Correlation::Matern32);
        let config = GpConfig::new()
            .backend(Backend::Mogp)
            .kernel(Kernel::Matern)
            .check()
            .unwrap();
        assert_eq!(config.correlation(), Correlation::Matern52);

        for corr in [
            Correlation::SquaredExponential,
            Correlation::Matern32,
            Correlation::Matern52,
        ] {
            assert_abs_diff_eq!(corr.value(0.), 1.);
            assert!(corr.value(0.5) > corr.value(1.));
            assert!(corr.value(20.) < 1e-6);
        }
        assert_abs_diff_eq!(
            Correlation::SquaredExponential.value(1.),
            (-0.5f64).exp(),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_length_scales() {
        let config = GpConfig::new()
            .kernel(Kernel::Rbf)
            .length_scale(2.)
            .n_restarts(3)
            .check()
            .unwrap();
        let scales = config.length_scales();
        assert_eq!(scales.len(), 4);
        assert_eq!(scales[0], 2.);
        assert_abs_diff_eq!(scales[1], 2e-4, epsilon = 1e-12);
        assert_abs_diff_eq!(scales[3], 2e4, epsilon = 1e-6);
        let config = GpConfig::new().n_restarts(0).check().unwrap();
        assert_eq!(config.length_scales(), vec![1.]);
    }

    #[test]
    fn test_nugget() {
        assert_eq!("fit".parse::<Nugget>().unwrap(), Nugget::Fit);
        assert_eq!("1e-6".parse::<Nugget>().unwrap(), Nugget::Fixed(1e-6));
        assert!("often".parse::<Nugget>().is_err());

        let config = GpConfig::new().nugget(Nugget::Fixed(1e-6)).check().unwrap();
        assert_eq!(
            config.noise(),
            Noise::Fitted {
                lower: 1e-6 * 1e-3,
                upper: 1e-6 * 1e3
            }
        );
        let levels = config.noise().levels();
        assert_eq!(levels.len(), N_NOISE_LEVELS);
        assert_abs_diff_eq!(levels[3], 1e-6, epsilon = 1e-15);

        let config = GpConfig::new().nugget(Nugget::Adaptive).check().unwrap();
        assert_eq!(config.noise(), Noise::Fixed(ADAPTIVE_NOISE_LEVEL));
        let config = GpConfig::new().nugget(Nugget::Disabled).check().unwrap();
        assert_eq!(config.noise().levels(), vec![0.]);

        let mogp = GpConfig::new().backend(Backend::Mogp);
        let config = mogp.clone().nugget(Nugget::Fixed(1e-6)).check().unwrap();
        assert_eq!(config.noise(), Noise::Fixed(1e-6));
        let config = mogp.nugget(Nugget::Adaptive).check().unwrap();
        let noise = config.noise();
        assert!(noise.is_adaptive());
        let levels = noise.levels();
        assert_eq!(levels[0], ADAPTIVE_NOISE_LEVEL);
        assert!(levels.windows(2).all(|w| w[0] < w[1]));
        assert!(*levels.last().unwrap() <= MAX_ADAPTIVE_NOISE_LEVEL);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(GpConfig::new().length_scale(0.).check().is_err());
        assert!(GpConfig::new().nugget(Nugget::Fixed(-1.)).check().is_err());
        assert!(GpConfig::new()
            .backend(Backend::Mogp)
            .bias(true)
            .check()
            .is_err());
        assert!(GpConfig::new()
            .backend(Backend::Mogp)
            .nugget(Nugget::Disabled)
            .check()
            .is_err());
    }
}
