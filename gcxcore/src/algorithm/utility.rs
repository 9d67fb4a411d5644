/// Mark local maxima of a dense signal. A value keeps its mark only if no
/// larger value sits within `window` positions on either side, ties go to
/// the earlier position.
pub fn find_local_maxima_mask(values: &[f64], window: usize) -> Vec<bool> {
    let mut local_maxima = vec![true; values.len()];

    for i in 0..values.len() {
        let current = values[i];
        for j in (i + 1)..values.len() {
            if j - i <= window {
                if current < values[j] {
                    local_maxima[i] = false;
                } else {
                    local_maxima[j] = false;
                }
            } else {
                break;
            }
        }
    }

    local_maxima
}

/// Keep the values whose mask entry is set.
pub fn filter_with_mask<T: Copy>(values: &[T], mask: &[bool]) -> Vec<T> {
    values
        .iter()
        .zip(mask.iter())
        .filter_map(|(&value, &keep)| if keep { Some(value) } else { None })
        .collect()
}

/// Positions whose mask entry is set.
pub fn mask_indices(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(index, &keep)| if keep { Some(index) } else { None })
        .collect()
}
