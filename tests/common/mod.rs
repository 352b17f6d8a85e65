#![allow(dead_code)]

use ndarray::Array2;
use drainage_tree::{FlowDirectionGrid, PointerScheme};

/// Esri D8 pointers by steepest descent; cells with no lower neighbour become sinks.
pub fn d8_from_dem(dem: &Array2<f64>) -> FlowDirectionGrid {
    let (rows, columns) = dem.dim();
    let mut d8 = Array2::<u8>::zeros((rows, columns));
    for row in 0..rows {
        for col in 0..columns {
            let z = dem[[row, col]];
            let mut best = 0.0;
            let mut code = 0u8;
            for dr in -1isize..=1 {
                for dc in -1isize..=1 {
                    let rn = row as isize + dr;
                    let cn = col as isize + dc;
                    if (dr == 0 && dc == 0) || rn < 0 || cn < 0 || rn >= rows as isize || cn >= columns as isize {
                        continue;
                    }
                    let dist = ((dr * dr + dc * dc) as f64).sqrt();
                    let drop = (z - dem[[rn as usize, cn as usize]]) / dist;
                    if drop > best {
                        best = drop;
                        code = PointerScheme::Esri.code_for(dr, dc).unwrap();
                    }
                }
            }
            d8[[row, col]] = code;
        }
    }
    FlowDirectionGrid::new(d8, PointerScheme::Esri).unwrap()
}

/// A lumpy surface with a handful of pits.
pub fn lumpy_dem(rows: usize, columns: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, columns), |(r, c)| {
        let (x, y) = (c as f64, r as f64);
        (x * 0.7).sin() * 3.0 + (y * 0.45).cos() * 2.0 + 0.05 * x + 0.03 * y
            + ((r * 31 + c * 17) % 7) as f64 * 0.013
    })
}
