use anyhow::Result;
use ndarray::{Array2, array};
use drainage_tree::{
    build_tree, compare, compare_range, flow_accumulation, CompareParams, FlowDirectionGrid,
    FlowSurface, GeoTransform, PointerScheme, SeedComparison, TreeParams,
};

fn main() -> Result<()> {
    env_logger::init();

    let fine: Array2<u8> = array![
        [1, 1, 1, 4],
        [1, 1, 1, 4],
        [1, 1, 2, 4],
        [1, 1, 1, 0],
    ];
    // the same area at half the resolution
    let coarse: Array2<u8> = array![
        [4, 4],
        [1, 0],
    ];
    let fine = FlowDirectionGrid::new(fine, PointerScheme::Esri)?;
    let coarse = FlowDirectionGrid::new(coarse, PointerScheme::Esri)?;

    let acc = flow_accumulation(&fine)?;
    let (_, seeds) = build_tree(&acc, &fine, &TreeParams::new(0))?;

    let a = FlowSurface::new(&fine, GeoTransform::new(0.0, 4.0, 1.0, -1.0));
    let b = FlowSurface::new(&coarse, GeoTransform::new(0.0, 4.0, 2.0, -2.0));

    let report = compare(&a, &b, seeds.as_slice(), &CompareParams::default())?;
    for s in &report.seeds {
        match &s.outcome {
            SeedComparison::Matched(m) => {
                println!("seed {} at {:?}: {}/{} cells agree", s.index, s.cell, m.matched, m.steps)
            }
            SeedComparison::NoMatch(e) => println!("seed {} at {:?}: {e}", s.index, s.cell),
        }
    }
    println!("mean score {:?}", report.mean_score());

    let loose = CompareParams { tolerance: 1, ..Default::default() };
    let report = compare_range(&a, &b, &seeds, 0..1, &loose)?;
    println!("first seed within one coarse cell: {:?}", report.scores());

    Ok(())
}
