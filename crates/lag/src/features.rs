use linfa::Float;
use ndarray::{aview0, ArrayBase, ArrayViewD, Data, Dimension};

/// An ordered set of feature arrays (or of single samples, one per feature
/// array, when used for streaming).
///
/// A feature set is built either from a single array with [`FeatureSet::single`]
/// or from several arrays with [`FeatureSet::multi`]. Position in the set is the
/// feature array index used by the lag lists and the symmetry flags.
#[derive(Clone, Debug)]
pub struct FeatureSet<'a, F: Float> {
    arrays: Vec<ArrayViewD<'a, F>>,
}

impl<'a, F: Float> FeatureSet<'a, F> {
    /// A feature set made of one feature array
    pub fn single<S, D>(array: &'a ArrayBase<S, D>) -> Self
    where
        S: Data<Elem = F>,
        D: Dimension,
    {
        FeatureSet {
            arrays: vec![array.view().into_dyn()],
        }
    }

    /// A feature set made of several feature arrays given in feature array order
    ///
    /// ```
    /// use lagbox_lag::FeatureSet;
    /// use ndarray::{array, Array3};
    ///
    /// let u = array![0., 1., 2., 3.];
    /// let sigma = Array3::<f64>::zeros((4, 2, 2));
    /// let features = FeatureSet::multi([u.view().into_dyn(), sigma.view().into_dyn()]);
    /// assert_eq!(features.len(), 2);
    /// ```
    pub fn multi<I>(arrays: I) -> Self
    where
        I: IntoIterator<Item = ArrayViewD<'a, F>>,
    {
        FeatureSet {
            arrays: arrays.into_iter().collect(),
        }
    }

    /// A set of scalar samples, one per feature array
    pub fn scalars(values: &'a [F]) -> Self {
        FeatureSet {
            arrays: values.iter().map(|v| aview0(v).into_dyn()).collect(),
        }
    }

    /// Number of feature arrays
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// View of the `i`th feature array
    pub fn get(&self, i: usize) -> Option<&ArrayViewD<'a, F>> {
        self.arrays.get(i)
    }

    /// Iterate over feature arrays in order
    pub fn iter(&self) -> impl Iterator<Item = &ArrayViewD<'a, F>> {
        self.arrays.iter()
    }

    pub(crate) fn arrays(&self) -> &[ArrayViewD<'a, F>] {
        &self.arrays
    }
}
