/*!
This library builds time-lagged supervised datasets from simulation time series
and maintains the streaming feature history needed to feed a surrogate model
with consistent lagged inputs while the simulation runs.

A [`Session`] is configured with one lag list per feature array (e.g. `[[1], [1, 2]]`
lags the first array by one step and the second by one and two steps) and one
symmetry flag per feature array. Symmetric matrix-valued features only keep their
upper triangular part.

* In batch mode, [`Session::build_batch`] turns the whole history of the feature
  arrays and the target into `(x_train, y_train)`.
* In online mode, [`Session::push`] appends the samples produced at each time step
  and [`Session::current_vector`] returns the lagged feature vector to predict the
  next step, with exactly the columns of a row of `x_train`.

Example:
```
use lagbox_lag::{FeatureSet, Session};
use ndarray::{Array1, Array3};

let n = 50;
let u = Array1::linspace(0., 1., n);
// symmetric 2x2 matrix per time step
let tau = Array3::from_shape_fn((n, 2, 2), |(t, i, j)| (t + i + j) as f64);
let target = Array1::linspace(1., 2., n);

let mut session = Session::configure(&[vec![1, 2], vec![1]], &[false, true]).unwrap();
let features = FeatureSet::multi([u.view().into_dyn(), tau.view().into_dyn()]);
let (x_train, y_train) = session.build_batch(&features, &target).unwrap();
// 2 lags of u + 1 lag of the 3 upper triangular entries of tau
assert_eq!(x_train.dim(), (48, 5));
assert_eq!(y_train.len(), 48);
```
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod batch;
mod errors;
mod features;
mod history;
mod schedule;
mod session;
pub mod symmetry;

pub use errors::*;
pub use features::*;
pub use history::*;
pub use schedule::*;
pub use session::*;
