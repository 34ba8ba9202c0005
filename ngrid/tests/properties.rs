//! Cross-cutting property and end-to-end scenario tests for the tensor
//! engine, exercised against a real device through [`SharedContext`].
//!
//! These need an actual Vulkan-capable adapter; they are ordinary
//! `#[test]` functions rather than a custom harness because the engine is
//! single-threaded and cooperative (no async GPU queue to drive).

use approx::assert_abs_diff_eq;
use gctx::{ContextConfig, SharedContext};
use ngrid::reduce::Divisor;
use ngrid::{shape, NGrid};
use once_cell::sync::Lazy;

static CONTEXT: Lazy<()> = Lazy::new(|| {
    let _ = env_logger::builder().is_test(true).try_init();
    SharedContext::get_or_init(ContextConfig::default());
});

fn init() {
    Lazy::force(&CONTEXT);
}

const EPS: f32 = 1e-4;

#[test]
fn fill_sets_every_element_to_the_given_value() {
    init();
    let g = NGrid::filled(shape![3, 4], 7.5);
    for v in g.to_vec() {
        assert_abs_diff_eq!(v, 7.5, epsilon = EPS);
    }
}

#[test]
fn add_then_subtract_recovers_the_original() {
    init();
    let a = NGrid::range(shape![2, 3], 0.0, 1.0);
    let b = NGrid::filled(shape![2, 3], 2.5);
    let recovered = a.add(&b).sub(&b);
    for (got, want) in recovered.to_vec().iter().zip(a.to_vec()) {
        assert_abs_diff_eq!(*got, want, epsilon = EPS);
    }
}

#[test]
fn transpose_is_its_own_inverse_under_the_inverse_permutation() {
    init();
    let a = NGrid::range(shape![2, 3, 4], 0.0, 1.0);
    let back = a.transpose(&[2, 0, 1]).transpose(&[1, 2, 0]);
    assert_eq!(back.shape().dims(), a.shape().dims());
    for (got, want) in back.to_vec().iter().zip(a.to_vec()) {
        assert_abs_diff_eq!(*got, want, epsilon = EPS);
    }
}

#[test]
fn reshape_to_flat_and_back_recovers_the_original() {
    init();
    let a = NGrid::range(shape![2, 3], 0.0, 1.0);
    let round_tripped = a.flatten().reshape(shape![2, 3]);
    assert_eq!(round_tripped.shape().dims(), a.shape().dims());
    for (got, want) in round_tripped.to_vec().iter().zip(a.to_vec()) {
        assert_abs_diff_eq!(*got, want, epsilon = EPS);
    }
}

#[test]
fn concatenate_reproduces_the_first_operand_in_its_leading_slabs() {
    init();
    let a = NGrid::range(shape![2, 3], 0.0, 1.0);
    let b = NGrid::filled(shape![4, 3], -1.0);
    let joined = a.concatenate(&b, 0);
    assert_eq!(joined.shape().dims(), &[6, 3]);

    let prefix = joined.subgrid(&[0, 0], shape![2, 3]);
    for (got, want) in prefix.to_vec().iter().zip(a.to_vec()) {
        assert_abs_diff_eq!(*got, want, epsilon = EPS);
    }
}

#[test]
fn square_matrix_times_its_inverse_is_the_identity() {
    init();
    let a = NGrid::from_vec(vec![4.0, 3.0, 6.0, 3.0]).reshape(shape![2, 2]);
    let inv = a.inverse().expect("square matrix must invert");
    let product = a.matmul(&inv);
    let identity = NGrid::identity(shape![2, 2]);
    for (got, want) in product.to_vec().iter().zip(identity.to_vec()) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-3);
    }
}

#[test]
fn lu_decomposition_reconstructs_the_source_under_the_permutation() {
    init();
    let a = NGrid::from_vec(vec![2.0, 1.0, 1.0, 4.0, 3.0, 3.0, 8.0, 7.0, 9.0]).reshape(shape![3, 3]);
    let (l, u, perm) = a.lu();
    let reconstructed = l.matmul(&u);

    let a_data = a.to_vec();
    let recon_data = reconstructed.to_vec();
    for (row, &src_row) in perm.iter().enumerate() {
        for col in 0..3 {
            let want = a_data[(src_row as usize) * 3 + col];
            let got = recon_data[row * 3 + col];
            assert_abs_diff_eq!(got, want, epsilon = 1e-3);
        }
    }

    // L is unit-lower-triangular, U is upper-triangular.
    let l_data = l.to_vec();
    let u_data = u.to_vec();
    for row in 0..3 {
        for col in 0..3 {
            if col > row {
                assert_abs_diff_eq!(l_data[row * 3 + col], 0.0, epsilon = EPS);
            } else if col == row {
                assert_abs_diff_eq!(l_data[row * 3 + col], 1.0, epsilon = EPS);
            }
            if col < row {
                assert_abs_diff_eq!(u_data[row * 3 + col], 0.0, epsilon = EPS);
            }
        }
    }
}

#[test]
fn mean_variance_and_stdev_agree_with_their_definitions() {
    init();
    let a = NGrid::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
    let n = a.len() as f32;
    let mean = a.mean();
    assert_abs_diff_eq!(mean, a.sum() / n, epsilon = EPS);

    let var = a.variance(Divisor::Population);
    let expected_var = a.to_vec().iter().map(|&x| (x - mean) * (x - mean)).sum::<f32>() / n;
    assert_abs_diff_eq!(var, expected_var, epsilon = EPS);
    assert_abs_diff_eq!(a.stdev(Divisor::Population), var.sqrt(), epsilon = EPS);
}

#[test]
fn ascending_and_descending_sorts_are_reverses_of_each_other() {
    init();
    let a = NGrid::from_vec(vec![1.0, 3.0, 2.0, 5.0, 4.0]);
    let asc = a.sort().to_vec();
    let desc = a.sort_descending().to_vec();
    let mut reversed_asc = asc.clone();
    reversed_asc.reverse();
    assert_eq!(asc, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(desc, reversed_asc);
}

#[test]
fn random_fill_is_deterministic_for_a_fixed_seed() {
    init();
    let a = NGrid::random_uniform(shape![5, 5], 1234, -1.0, 1.0);
    let b = NGrid::random_uniform(shape![5, 5], 1234, -1.0, 1.0);
    assert_eq!(a.to_vec(), b.to_vec());
}

// Concrete end-to-end scenarios (specification §8).

#[test]
fn scenario_binary_image_convolution_then_max_pool_stays_in_the_expected_range() {
    init();
    let image = NGrid::random_binary(shape![10, 10], 42);
    let kernel = NGrid::filled(shape![3, 3], 1.0);
    let convolved = image.convolve(&kernel);
    let pooled = convolved.pool(ngrid::conv::PoolKind::Max, (2, 2), (2, 2));

    assert_eq!(pooled.shape().dims(), &[5, 5]);
    for v in pooled.to_vec() {
        assert!((0.0..=9.0).contains(&v), "pooled value {v} out of [0, 9]");
    }
}

#[test]
fn scenario_range_fill_matches_hand_computed_statistics() {
    init();
    let a = NGrid::range(shape![4], 0.0, 1.0);
    assert_eq!(a.to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
    assert_abs_diff_eq!(a.sum(), 6.0, epsilon = EPS);
    assert_abs_diff_eq!(a.mean(), 1.5, epsilon = EPS);
    assert_abs_diff_eq!(a.max_value(), 3.0, epsilon = EPS);
}

#[test]
fn scenario_known_matrix_lu_and_inverse_reconstruct_within_tolerance() {
    init();
    let a = NGrid::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0]).reshape(shape![3, 3]);
    let (l, u, perm) = a.lu();
    let reconstructed = l.matmul(&u);
    let a_data = a.to_vec();
    let recon_data = reconstructed.to_vec();
    for (row, &src_row) in perm.iter().enumerate() {
        for col in 0..3 {
            assert_abs_diff_eq!(
                recon_data[row * 3 + col],
                a_data[(src_row as usize) * 3 + col],
                epsilon = 1e-5
            );
        }
    }

    let inv = a.inverse().unwrap();
    let identity = a.matmul(&inv);
    for v in identity.to_vec() {
        // Checked cell-by-cell against the identity below, this loop only
        // guards against NaNs/infinities sneaking through.
        assert!(v.is_finite());
    }
    let expected = NGrid::identity(shape![3, 3]);
    for (got, want) in identity.to_vec().iter().zip(expected.to_vec()) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-5);
    }
}

#[test]
fn scenario_transpose_swaps_row_and_column_coordinates() {
    init();
    let a = NGrid::range(shape![2, 3], 0.0, 1.0);
    let t = a.transpose(&[1, 0]);
    assert_eq!(t.shape().dims(), &[3, 2]);
    for i in 0..2u32 {
        for j in 0..3u32 {
            let src = a.get(a.shape().flat_index(&[i, j]));
            let dst = t.get(t.shape().flat_index(&[j, i]));
            assert_abs_diff_eq!(src, dst, epsilon = EPS);
        }
    }
}

#[test]
fn scenario_sort_matches_the_worked_example() {
    init();
    let a = NGrid::from_vec(vec![1.0, 3.0, 2.0, 5.0, 4.0]);
    assert_eq!(a.sort().to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(a.sort_descending().to_vec(), vec![5.0, 4.0, 3.0, 2.0, 1.0]);
}

#[test]
fn scenario_identity_times_a_vector_returns_the_vector_unchanged() {
    init();
    let identity = NGrid::identity(shape![4, 4]);
    let v = NGrid::from_vec(vec![2.0, -1.0, 0.5, 3.0]).reshape(shape![4, 1]);
    let result = identity.matmul(&v);
    for (got, want) in result.to_vec().iter().zip(v.to_vec()) {
        assert_abs_diff_eq!(*got, want, epsilon = EPS);
    }
}
