/// All windows of `segment_length` over `sequence`.
///
/// With a `prefix`, the windows are preceded by the partial windows at the
/// start of the sequence, left-padded with the prefix value.
pub fn sequence_segmentation<T: Clone>(sequence: &[T], segment_length: usize, prefix: Option<T>) -> Vec<Vec<T>> {
    let mut segments = Vec::new();
    if segment_length == 0 {
        return segments;
    }
    if let Some(pad) = prefix {
        for padding in (1..segment_length).rev() {
            let take = segment_length - padding;
            if sequence.len() >= take {
                let mut segment = vec![pad.clone(); padding];
                segment.extend_from_slice(&sequence[..take]);
                segments.push(segment);
            }
        }
    }
    segments.extend(sequence.windows(segment_length).map(<[T]>::to_vec));
    segments
}
