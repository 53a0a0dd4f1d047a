use ndarray::Array2;

/// Cosine similarity of two vectors; 0.0 when either has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Stack equal-length vectors into a row-normalized matrix
///
/// Returns `None` when rows are empty or dimensions disagree. Zero rows stay zero.
fn normalized_rows(rows: &[Vec<f32>]) -> Option<Array2<f32>> {
    let dim = rows.first()?.len();
    if dim == 0 || rows.iter().any(|r| r.len() != dim) {
        return None;
    }

    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    let mut matrix = Array2::from_shape_vec((rows.len(), dim), flat).ok()?;

    for mut row in matrix.rows_mut() {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row /= norm;
        }
    }
    Some(matrix)
}

/// Pairwise cosine similarities, shape `a.len() x b.len()`
///
/// Returns `None` when either side is empty or the dimensions differ.
pub fn similarity_matrix(a: &[Vec<f32>], b: &[Vec<f32>]) -> Option<Array2<f32>> {
    let a = normalized_rows(a)?;
    let b = normalized_rows(b)?;
    if a.ncols() != b.ncols() {
        return None;
    }
    Some(a.dot(&b.t()))
}

/// Maximum of each row
pub fn row_max(matrix: &Array2<f32>) -> Vec<f32> {
    matrix
        .rows()
        .into_iter()
        .map(|row| row.iter().copied().fold(f32::NEG_INFINITY, f32::max))
        .collect()
}
