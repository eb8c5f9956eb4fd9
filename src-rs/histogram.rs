//! Dominant border color: the most frequent exact RGB value of an image.
//!
//! Every pixel is counted, no bucketing. When several colors share the top
//! count, the one that appears first in row-major scan order wins, so the
//! result is stable for identical input.

use crate::color::Rgb;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct ColorCount {
    count: u64,
    first_seen: usize,
}

/// Returns the mode of the RGB triples in an RGBA8 buffer, ignoring alpha.
///
/// `None` only for a buffer without a single complete pixel.
pub fn dominant_color(rgba: &[u8]) -> Option<Rgb> {
    let mut counts: HashMap<u32, ColorCount> = HashMap::new();
    for (index, px) in rgba.chunks_exact(4).enumerate() {
        let key = Rgb([px[0], px[1], px[2]]).packed();
        counts
            .entry(key)
            .and_modify(|c| c.count += 1)
            .or_insert(ColorCount {
                count: 1,
                first_seen: index,
            });
    }

    counts
        .into_iter()
        .max_by(|(_, a), (_, b)| {
            a.count
                .cmp(&b.count)
                .then_with(|| b.first_seen.cmp(&a.first_seen))
        })
        .map(|(key, _)| Rgb::from_packed(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn buffer(pixels: &[[u8; 4]]) -> Vec<u8> {
        pixels.iter().flatten().copied().collect()
    }

    #[test]
    fn single_color_image_returns_that_color() {
        let data = buffer(&[[30, 30, 30, 255]; 64 * 48]);
        assert_eq!(dominant_color(&data), Some(Rgb::new(30, 30, 30)));
    }

    #[test]
    fn alpha_is_ignored() {
        let data = buffer(&[
            [10, 20, 30, 0],
            [10, 20, 30, 128],
            [10, 20, 30, 255],
            [1, 2, 3, 255],
        ]);
        assert_eq!(dominant_color(&data), Some(Rgb::new(10, 20, 30)));
    }

    #[test]
    fn near_colors_are_not_merged() {
        let data = buffer(&[
            [100, 100, 100, 255],
            [100, 100, 101, 255],
            [100, 100, 102, 255],
            [7, 7, 7, 255],
            [7, 7, 7, 255],
        ]);
        assert_eq!(dominant_color(&data), Some(Rgb::new(7, 7, 7)));
    }

    #[test]
    fn ties_resolve_to_first_seen_color() {
        let data = buffer(&[
            [0, 0, 255, 255],
            [255, 0, 0, 255],
            [255, 0, 0, 255],
            [0, 0, 255, 255],
        ]);
        assert_eq!(dominant_color(&data), Some(Rgb::new(0, 0, 255)));

        let swapped = buffer(&[
            [255, 0, 0, 255],
            [0, 0, 255, 255],
            [0, 0, 255, 255],
            [255, 0, 0, 255],
        ]);
        assert_eq!(dominant_color(&swapped), Some(Rgb::new(255, 0, 0)));
    }

    #[test]
    fn every_pixel_distinct_still_resolves() {
        let data: Vec<u8> = (0u32..256 * 256)
            .flat_map(|i| [(i >> 8) as u8, i as u8, 7, 255])
            .collect();
        assert_eq!(dominant_color(&data), Some(Rgb::new(0, 0, 7)));
    }

    #[test]
    fn empty_buffer_has_no_color() {
        assert_eq!(dominant_color(&[]), None);
        assert_eq!(dominant_color(&[1, 2, 3]), None);
    }

    proptest! {
        #[test]
        fn majority_color_always_wins(
            noise in proptest::collection::vec(any::<[u8; 3]>(), 0..200),
            extra in 1usize..50,
        ) {
            let majority = [42u8, 17, 99];
            let mut pixels: Vec<[u8; 4]> = noise
                .iter()
                .map(|c| [c[0], c[1], c[2], 255])
                .collect();
            let count = noise.len() + extra;
            let majority_px = [majority[0], majority[1], majority[2], 255];
            pixels.extend(std::iter::repeat(majority_px).take(count));
            pixels.rotate_left(noise.len() / 2);
            prop_assert_eq!(dominant_color(&buffer(&pixels)), Some(Rgb(majority)));
        }

        #[test]
        fn single_color_image_of_any_size(
            width in 1usize..64,
            height in 1usize..64,
            color in any::<[u8; 3]>(),
            alpha in any::<u8>(),
        ) {
            let px = [color[0], color[1], color[2], alpha];
            let data = buffer(&vec![px; width * height]);
            prop_assert_eq!(dominant_color(&data), Some(Rgb(color)));
        }

        #[test]
        fn result_is_reproducible(data in proptest::collection::vec(any::<u8>(), 4..400)) {
            prop_assert_eq!(dominant_color(&data), dominant_color(&data));
        }
    }
}
