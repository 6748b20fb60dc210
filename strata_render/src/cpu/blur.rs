// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Separable Gaussian blur and unsharp masking.
//!
//! Both work on premultiplied unit floats. For the blur, pixels outside the
//! raster count as transparent, so content fades out at the edges instead of
//! smearing the border; callers that want the halo pad first. Unsharp
//! masking renormalizes the kernel at the edges instead, so the border is
//! not mistaken for a dark edge.

use tiny_skia::Pixmap;

use super::raster::{pack, unpack};

/// Normalized kernel of radius `ceil(3σ)`, or `None` when σ is too small to
/// matter.
#[expect(
    clippy::cast_possible_truncation,
    reason = "kernel radius is small and non-negative"
)]
pub(crate) fn gaussian_kernel(sigma: f32) -> Option<(Vec<f32>, usize)> {
    let radius = (sigma.abs() * 3.0).ceil() as usize;
    if radius == 0 || !sigma.is_finite() {
        return None;
    }
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    Some((kernel, radius))
}

/// Convolves `src` (width × height) along one axis.
fn convolve(
    src: &[[f32; 4]],
    width: usize,
    height: usize,
    kernel: &[f32],
    radius: usize,
    horizontal: bool,
    renormalize: bool,
) -> Vec<[f32; 4]> {
    let mut dst = vec![[0.0; 4]; src.len()];
    let (along, across) = if horizontal {
        (width, height)
    } else {
        (height, width)
    };
    let index = |a: usize, b: usize| {
        if horizontal { b * width + a } else { a * width + b }
    };
    for b in 0..across {
        for a in 0..along {
            let mut acc = [0.0_f32; 4];
            let mut weight = 0.0;
            for (i, w) in kernel.iter().enumerate() {
                let Some(s) = (a + i).checked_sub(radius).filter(|s| *s < along) else {
                    continue;
                };
                for (sum, v) in acc.iter_mut().zip(src[index(s, b)]) {
                    *sum += v * w;
                }
                weight += w;
            }
            if renormalize && weight > 0.0 {
                acc = acc.map(|v| v / weight);
            }
            dst[index(a, b)] = acc;
        }
    }
    dst
}

fn blur_floats(pm: &Pixmap, sigma: f32, renormalize: bool) -> Vec<[f32; 4]> {
    let src = unpack(pm);
    let Some((kernel, radius)) = gaussian_kernel(sigma) else {
        return src;
    };
    let (w, h) = (pm.width() as usize, pm.height() as usize);
    let tmp = convolve(&src, w, h, &kernel, radius, true, renormalize);
    convolve(&tmp, w, h, &kernel, radius, false, renormalize)
}

/// Gaussian blur with standard deviation `sigma` pixels.
#[expect(
    clippy::cast_possible_truncation,
    reason = "blur radii are far below f32 precision limits"
)]
pub(crate) fn gaussian_blur(pm: &Pixmap, sigma: f64) -> Pixmap {
    let mut out = pm.clone();
    pack(&mut out, &blur_floats(pm, sigma as f32, false));
    out
}

/// `src + (src - blur(src)) × intensity` on color channels; alpha is kept.
#[expect(
    clippy::cast_possible_truncation,
    reason = "blur radii and intensities are far below f32 precision limits"
)]
pub(crate) fn unsharp(pm: &Pixmap, radius: f64, intensity: f64) -> Pixmap {
    let blurred = blur_floats(pm, radius as f32, true);
    let k = intensity as f32;
    let mut sharp = unpack(pm);
    for (px, b) in sharp.iter_mut().zip(&blurred) {
        for (v, soft) in px.iter_mut().zip(b).take(3) {
            *v += (*v - soft) * k;
        }
    }
    let mut out = pm.clone();
    pack(&mut out, &sharp);
    out
}
