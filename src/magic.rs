/*!
# Magic Square Deviation

Scores how far a square grid is from being magic. A grid of order `n` is magic when
every row, every column and both diagonals sum to the magic constant `M = n(n^2+1)/2`.
The deviation `Q` is the sum of `|line sum - M|` over all `2n + 2` lines, so `Q == 0`
exactly when the grid is magic.

All sums are taken in 64-bit integer arithmetic, so the deviation is exact. The
evaluator only looks at line sums; it does not care whether the cells form a
permutation of `1..=n^2`.

## Examples

```rust
use magic_mcmc::magic::{deviation, is_magic, magic_constant};

let lo_shu = [8, 1, 6, 3, 5, 7, 4, 9, 2];
assert_eq!(deviation(&lo_shu), Ok(0));
assert_eq!(is_magic(&lo_shu), Ok(true));
assert_eq!(magic_constant(3), 15);
```
*/

use ndarray::{s, ArrayView1, ArrayView2};
use num_traits::{AsPrimitive, PrimInt};
use thiserror::Error;

/// Error for cell slices that do not describe a square grid.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidShapeError {
    /// The grid has no cells at all.
    #[error("grid has no cells")]
    Empty,

    /// The number of cells has no integer square root.
    #[error("{len} cells do not fill a square grid")]
    NotSquare { len: usize },

    /// The caller-provided order does not match the number of cells.
    #[error("order {order} needs {expected} cells, got {len}")]
    OrderMismatch {
        order: usize,
        expected: usize,
        len: usize,
    },
}

/**
Returns the magic constant `M = n(n^2 + 1) / 2` for squares of the given order.

Every line of a magic square of order `n` sums to this value.

# Examples

```rust
use magic_mcmc::magic::magic_constant;

assert_eq!(magic_constant(3), 15);
assert_eq!(magic_constant(4), 34);
```
*/
pub fn magic_constant(order: usize) -> u64 {
    let n = order as u64;
    n * (n * n + 1) / 2
}

/**
Computes the deviation of a row-major grid whose order is inferred from its length.

# Arguments

* `cells` - The grid cells in row-major order; any primitive integer type works.

# Returns

The summed absolute deviation of all row, column and diagonal sums from the magic
constant, or an [`InvalidShapeError`] if the slice is empty or its length is not a
perfect square.

# Examples

```rust
use magic_mcmc::magic::{deviation, InvalidShapeError};

assert_eq!(deviation(&[8, 1, 6, 3, 5, 7, 4, 9, 2]), Ok(0));
assert_eq!(
    deviation(&[1, 2, 3, 4, 5]),
    Err(InvalidShapeError::NotSquare { len: 5 })
);
```
*/
pub fn deviation<T>(cells: &[T]) -> Result<u64, InvalidShapeError>
where
    T: PrimInt + AsPrimitive<i64>,
{
    if cells.is_empty() {
        return Err(InvalidShapeError::Empty);
    }
    let order = (cells.len() as f64).sqrt().round() as usize;
    if order * order != cells.len() {
        return Err(InvalidShapeError::NotSquare { len: cells.len() });
    }
    deviation_with_order(cells, order)
}

/**
Computes the deviation of a row-major grid of a caller-provided order.

# Arguments

* `cells` - The grid cells in row-major order.
* `order` - The side length of the grid; must satisfy `order * order == cells.len()`.

# Returns

The deviation as in [`deviation`], or an [`InvalidShapeError`] if `order` is zero or
does not match the number of cells.
*/
pub fn deviation_with_order<T>(cells: &[T], order: usize) -> Result<u64, InvalidShapeError>
where
    T: PrimInt + AsPrimitive<i64>,
{
    if order == 0 {
        return Err(InvalidShapeError::Empty);
    }
    let expected = order * order;
    if cells.len() != expected {
        return Err(InvalidShapeError::OrderMismatch {
            order,
            expected,
            len: cells.len(),
        });
    }

    let grid = ArrayView2::from_shape((order, order), cells)
        .expect("Expected reshaping a length-checked slice to succeed");
    let m = magic_constant(order) as i64;

    let mut total = 0u64;
    for row in grid.rows() {
        total += (line_sum(row) - m).unsigned_abs();
    }
    for column in grid.columns() {
        total += (line_sum(column) - m).unsigned_abs();
    }
    total += (line_sum(grid.diag()) - m).unsigned_abs();
    total += (line_sum(grid.slice(s![.., ..;-1]).diag()) - m).unsigned_abs();
    Ok(total)
}

/**
Reports whether a row-major grid is a magic square, i.e. has deviation zero.

Like [`deviation`], this checks line sums only; a grid with repeated cell values can
still count as magic here.

# Examples

```rust
use magic_mcmc::magic::is_magic;

assert_eq!(is_magic(&[8, 1, 6, 3, 5, 7, 4, 9, 2]), Ok(true));
assert_eq!(is_magic(&[1, 2, 3, 4, 5, 6, 7, 8, 9]), Ok(false));
```
*/
pub fn is_magic<T>(cells: &[T]) -> Result<bool, InvalidShapeError>
where
    T: PrimInt + AsPrimitive<i64>,
{
    Ok(deviation(cells)? == 0)
}

fn line_sum<T>(line: ArrayView1<'_, T>) -> i64
where
    T: PrimInt + AsPrimitive<i64>,
{
    line.iter().map(|&c| c.as_()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lo_shu_is_magic() {
        let lo_shu = [8u32, 1, 6, 3, 5, 7, 4, 9, 2];
        assert_eq!(deviation(&lo_shu), Ok(0));
        assert_eq!(is_magic(&lo_shu), Ok(true));
    }

    #[test]
    fn identity_grid_deviations() {
        let identity_2: Vec<u32> = (1..=4).collect();
        let identity_3: Vec<u32> = (1..=9).collect();
        let identity_4: Vec<u32> = (1..=16).collect();
        assert_eq!(deviation(&identity_2), Ok(6));
        assert_eq!(deviation(&identity_3), Ok(24));
        assert_eq!(deviation(&identity_4), Ok(80));
    }

    #[test]
    fn order_one_counts_all_four_lines() {
        // The single-cell grid still has one row, one column and two diagonals.
        assert_eq!(deviation(&[1u32]), Ok(0));
        assert_eq!(deviation(&[0i32]), Ok(4));
    }

    #[test]
    fn magic_constants() {
        assert_eq!(magic_constant(1), 1);
        assert_eq!(magic_constant(2), 5);
        assert_eq!(magic_constant(3), 15);
        assert_eq!(magic_constant(4), 34);
        assert_eq!(magic_constant(5), 65);
    }

    #[test]
    fn rejects_empty_grids() {
        let empty: [u32; 0] = [];
        assert_eq!(deviation(&empty), Err(InvalidShapeError::Empty));
        assert_eq!(
            deviation_with_order(&[1u32, 2, 3, 4], 0),
            Err(InvalidShapeError::Empty)
        );
    }

    #[test]
    fn rejects_non_square_lengths() {
        assert_eq!(
            deviation(&[1u32, 2, 3, 4, 5]),
            Err(InvalidShapeError::NotSquare { len: 5 })
        );
        assert_eq!(
            deviation(&[1u32, 2, 3, 4, 5, 6, 7]),
            Err(InvalidShapeError::NotSquare { len: 7 })
        );
    }

    #[test]
    fn rejects_mismatched_orders() {
        let lo_shu = [8u32, 1, 6, 3, 5, 7, 4, 9, 2];
        assert_eq!(
            deviation_with_order(&lo_shu, 4),
            Err(InvalidShapeError::OrderMismatch {
                order: 4,
                expected: 16,
                len: 9
            })
        );
        assert_eq!(deviation_with_order(&lo_shu, 3), Ok(0));
    }

    #[test]
    fn accepts_any_primitive_integer_cells() {
        let narrow: [u8; 9] = [8, 1, 6, 3, 5, 7, 4, 9, 2];
        let wide: [i64; 9] = [8, 1, 6, 3, 5, 7, 4, 9, 2];
        assert_eq!(deviation(&narrow), Ok(0));
        assert_eq!(deviation(&wide), Ok(0));
        assert_eq!(deviation_with_order(&[1usize], 1), Ok(0));
    }

    #[test]
    fn deviation_scores_line_sums_only() {
        // A constant grid hits every line sum exactly without being a permutation.
        assert_eq!(deviation(&[5u32; 9]), Ok(0));
        assert_eq!(is_magic(&[5u32; 9]), Ok(true));
    }
}
