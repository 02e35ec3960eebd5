//! The combine stage: turns a pair of slices into one bin index per element.
//!
//! The element-wise function is a plain [`CombineFn`] looked up by name, in
//! the same way a node would pick an accelerator kernel. Pairs are evaluated
//! on the rayon pool in no particular order; the output keeps the input's
//! index order.
//!
//! # Example
//!
//! ```
//! # use histlite::Result;
//! use histlite::{combine, BinLayout};
//! # fn main() -> Result<()> {
//! let sum = combine::named("sum")?;
//! let bins = combine::combine(&sum, &[1.0, 40.0], &[1.0, 99.0], BinLayout::new(80)?)?;
//! assert_eq!(bins, vec![2, 79]);
//! # Ok(())
//! # }
//! ```

use rayon::prelude::*;

use crate::{BinIndex, BinLayout, HistError, Result};

/// Maps one element from each vector to a raw (unclamped) bin value.
pub type CombineFn = fn(a: f32, b: f32) -> i64;

/// A named element-wise function.
#[derive(Copy, Clone, Debug)]
pub struct Kernel {
    pub name: &'static str,
    pub combine_fn: CombineFn,
}

// `as` saturates and sends NaN to 0, which the layout then clamps.
fn sum(a: f32, b: f32) -> i64 {
    (a + b).floor() as i64
}

fn difference(a: f32, b: f32) -> i64 {
    (a - b).abs().floor() as i64
}

fn product(a: f32, b: f32) -> i64 {
    (a * b).floor() as i64
}

/// Names accepted by [`try_named`].
pub const KERNELS: &[&str] = &["sum", "difference", "product"];

/// Gets the [`Kernel`] named `name`.
///
/// Returns [`None`] if no kernel with the given name exists.
pub fn try_named(name: &str) -> Option<Kernel> {
    match name {
        "sum" => Some(Kernel {
            name: "sum",
            combine_fn: sum,
        }),
        "difference" => Some(Kernel {
            name: "difference",
            combine_fn: difference,
        }),
        "product" => Some(Kernel {
            name: "product",
            combine_fn: product,
        }),
        _ => None,
    }
}

/// Gets the [`Kernel`] named `name`, or a configuration error listing the
/// known kernels.
pub fn named(name: &str) -> Result<Kernel> {
    try_named(name).ok_or_else(|| {
        HistError::Configuration(format!(
            "no kernel named `{name}` (expected one of: {})",
            KERNELS.join(", ")
        ))
    })
}

/// Combines `a` and `b` pairwise and clamps each result into `layout`.
pub fn combine(kernel: &Kernel, a: &[f32], b: &[f32], layout: BinLayout) -> Result<Vec<BinIndex>> {
    if a.len() != b.len() {
        return Err(HistError::Configuration(format!(
            "cannot combine slices of {} and {} elements",
            a.len(),
            b.len()
        )));
    }
    let f = kernel.combine_fn;
    Ok(a.par_iter()
        .zip(b.par_iter())
        .map(|(&x, &y)| layout.clamp(f(x, y)))
        .collect())
}
