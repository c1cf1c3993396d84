//! Statistical side of the router: vector space model, linear classifier,
//! probability calibration and the similarity index.

pub mod calibration;
pub mod similarity;
pub mod svm;
pub mod tfidf;

/// Dot product of two equally sized dense vectors.
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean norm of a dense vector.
pub(crate) fn l2_norm(a: &[f64]) -> f64 {
    a.iter().map(|x| x * x).sum::<f64>().sqrt()
}
