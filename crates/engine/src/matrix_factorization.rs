//! Matrix Factorization using truncated SVD
//!
//! Decomposes the dense user-item rating matrix into a reduced-rank
//! representation with a seeded randomized range finder followed by an exact
//! eigen-decomposition of the small projected problem. Reconstructed rows give
//! a score for every article.

use crate::error::{RecommendError, Result};
use crate::types::InteractionTriple;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

const ORTHO_EPSILON: f64 = 1e-10;
const SINGULAR_EPSILON: f64 = 1e-9;
const MAX_JACOBI_SWEEPS: usize = 64;

/// Randomized SVD configuration parameters
#[derive(Debug, Clone)]
pub struct SvdConfig {
    /// Upper bound on the number of latent factors
    pub max_latent_factors: usize,
    /// Extra projections beyond the target rank
    pub oversamples: usize,
    /// Power iterations sharpening the range estimate
    pub power_iterations: usize,
    /// Seed for the random projection
    pub seed: u64,
}

impl Default for SvdConfig {
    fn default() -> Self {
        Self {
            max_latent_factors: 100,
            oversamples: 10,
            power_iterations: 5,
            seed: 42,
        }
    }
}

/// SVD-based matrix factorization
pub struct MatrixFactorization {
    config: SvdConfig,
    /// User factors scaled by singular values: [num_users x rank]
    pub user_factors: Option<Array2<f32>>,
    /// Right singular vectors: [rank x num_items]
    pub components: Option<Array2<f32>>,
    /// User ID to matrix index mapping
    pub user_id_map: HashMap<String, usize>,
    /// Item ID to matrix index mapping
    pub item_id_map: HashMap<String, usize>,
    /// Reverse mapping: index to user ID
    pub user_ids: Vec<String>,
    /// Reverse mapping: index to item ID
    pub item_ids: Vec<String>,
}

impl MatrixFactorization {
    pub fn new(config: SvdConfig) -> Self {
        Self {
            config,
            user_factors: None,
            components: None,
            user_id_map: HashMap::new(),
            item_id_map: HashMap::new(),
            user_ids: Vec::new(),
            item_ids: Vec::new(),
        }
    }

    /// Build the dense rating matrix; indices follow first appearance
    pub fn build_matrix(&mut self, interactions: &[InteractionTriple]) -> Array2<f32> {
        self.user_id_map.clear();
        self.item_id_map.clear();
        self.user_ids.clear();
        self.item_ids.clear();

        let mut cells = Vec::with_capacity(interactions.len());
        for triple in interactions {
            let user_idx = index_of(
                &mut self.user_id_map,
                &mut self.user_ids,
                &triple.user_id,
            );
            let item_idx = index_of(
                &mut self.item_id_map,
                &mut self.item_ids,
                &triple.article_id,
            );
            cells.push((user_idx, item_idx, triple.rating));
        }

        let mut matrix = Array2::<f32>::zeros((self.user_ids.len(), self.item_ids.len()));
        for (u, i, rating) in cells {
            matrix[[u, i]] = rating;
        }
        matrix
    }

    /// Rank used for a matrix of this shape: min(max_factors, min(users, items) - 1)
    pub fn target_rank(&self, num_users: usize, num_items: usize) -> Result<usize> {
        if num_users < 2 || num_items < 2 {
            return Err(RecommendError::DegenerateInput {
                users: num_users,
                items: num_items,
            });
        }
        Ok(self
            .config
            .max_latent_factors
            .min(num_users.min(num_items) - 1))
    }

    /// Factorize the rating matrix
    pub fn fit(&mut self, matrix: &Array2<f32>) -> Result<()> {
        let (num_users, num_items) = matrix.dim();
        let rank = self.target_rank(num_users, num_items)?;

        tracing::debug!(num_users, num_items, rank, "Fitting truncated SVD");

        let (user_factors, components) = randomized_svd(matrix, rank, &self.config)?;
        self.user_factors = Some(user_factors);
        self.components = Some(components);

        Ok(())
    }

    /// Reconstructed score for every item, indexed like `item_ids`
    pub fn score_user(&self, user_id: &str) -> Result<Array1<f32>> {
        let user_idx = self.user_index(user_id)?;
        let (user_factors, components) = self.factors()?;

        Ok(user_factors.row(user_idx).dot(components))
    }

    /// Predict rating for user-item pair
    pub fn predict(&self, user_id: &str, item_id: &str) -> Result<f32> {
        let user_idx = self.user_index(user_id)?;
        let item_idx = *self.item_id_map.get(item_id).ok_or_else(|| {
            RecommendError::Factorization(format!("Item {} not in training set", item_id))
        })?;
        let (user_factors, components) = self.factors()?;

        Ok(user_factors
            .row(user_idx)
            .dot(&components.index_axis(Axis(1), item_idx)))
    }

    /// Get user embedding
    pub fn get_user_embedding(&self, user_id: &str) -> Result<Vec<f32>> {
        let user_idx = self.user_index(user_id)?;
        let (user_factors, _) = self.factors()?;
        Ok(user_factors.row(user_idx).to_vec())
    }

    fn user_index(&self, user_id: &str) -> Result<usize> {
        self.user_id_map.get(user_id).copied().ok_or_else(|| {
            RecommendError::Factorization(format!("User {} not in training set", user_id))
        })
    }

    fn factors(&self) -> Result<(&Array2<f32>, &Array2<f32>)> {
        match (&self.user_factors, &self.components) {
            (Some(u), Some(c)) => Ok((u, c)),
            _ => Err(RecommendError::Factorization(
                "Model not trained yet".to_string(),
            )),
        }
    }
}

fn index_of(map: &mut HashMap<String, usize>, ids: &mut Vec<String>, id: &str) -> usize {
    if let Some(&idx) = map.get(id) {
        return idx;
    }
    let idx = ids.len();
    map.insert(id.to_string(), idx);
    ids.push(id.to_string());
    idx
}

/// Randomized truncated SVD returning (U * Sigma, V^T)
fn randomized_svd(
    matrix: &Array2<f32>,
    rank: usize,
    config: &SvdConfig,
) -> Result<(Array2<f32>, Array2<f32>)> {
    let (m, n) = matrix.dim();
    let width = (rank + config.oversamples).min(m.min(n));

    let mut rng = StdRng::seed_from_u64(config.seed);
    let omega = Array2::<f32>::from_shape_fn((n, width), |_| rng.gen_range(-1.0..1.0));

    // Range finder with power iterations: Q spans the dominant column space
    let mut q = orthonormalize_columns(&matrix.dot(&omega));
    for _ in 0..config.power_iterations {
        let z = orthonormalize_columns(&matrix.t().dot(&q));
        q = orthonormalize_columns(&matrix.dot(&z));
    }

    // Small projected problem B = Q^T A, SVD via eigen-decomposition of B B^T
    let b = q.t().dot(matrix);
    let gram = b.dot(&b.t()).mapv(f64::from);
    let (eigenvalues, eigenvectors) = symmetric_eigen(&gram)?;

    let mut user_factors = Array2::<f32>::zeros((m, rank));
    let mut components = Array2::<f32>::zeros((rank, n));

    for i in 0..rank {
        let sigma = eigenvalues[i].max(0.0).sqrt();
        if sigma < SINGULAR_EPSILON {
            continue;
        }

        let w = eigenvectors.column(i).mapv(|v| v as f32);
        // u_i = Q w_i, v_i = B^T w_i / sigma_i
        let u = q.dot(&w);
        let v = w.dot(&b) / sigma as f32;

        user_factors
            .column_mut(i)
            .assign(&(u * sigma as f32));
        components.row_mut(i).assign(&v);
    }

    Ok((user_factors, components))
}

/// Modified Gram-Schmidt on the columns, computed in f64
fn orthonormalize_columns(matrix: &Array2<f32>) -> Array2<f32> {
    let mut q = matrix.mapv(f64::from);

    for j in 0..q.ncols() {
        for k in 0..j {
            let qk = q.column(k).to_owned();
            let projection = qk.dot(&q.column(j));
            q.column_mut(j).scaled_add(-projection, &qk);
        }

        let norm = q.column(j).dot(&q.column(j)).sqrt();
        if norm > ORTHO_EPSILON {
            q.column_mut(j).mapv_inplace(|v| v / norm);
        } else {
            // rank-deficient direction
            q.column_mut(j).fill(0.0);
        }
    }

    q.mapv(|v| v as f32)
}

/// Cyclic Jacobi eigen-decomposition of a symmetric matrix.
///
/// Returns eigenvalues in descending order with matching eigenvector columns.
fn symmetric_eigen(matrix: &Array2<f64>) -> Result<(Vec<f64>, Array2<f64>)> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(RecommendError::Factorization(format!(
            "Eigen-decomposition needs a square matrix, got {:?}",
            matrix.dim()
        )));
    }

    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);
    let scale: f64 = a.iter().map(|x| x * x).sum::<f64>().max(f64::MIN_POSITIVE);

    for _ in 0..MAX_JACOBI_SWEEPS {
        let mut off_diagonal = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off_diagonal += a[[p, q]] * a[[p, q]];
            }
        }
        if off_diagonal <= 1e-24 * scale {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq == 0.0 {
                    continue;
                }

                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));

    let eigenvalues = order.iter().map(|&i| a[[i, i]]).collect();
    let mut eigenvectors = Array2::<f64>::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        eigenvectors.column_mut(dst).assign(&v.column(src));
    }

    Ok((eigenvalues, eigenvectors))
}
