use anyhow::Result;
use ndarray::{Array2, array};
use drainage_tree::{
    flow_accumulation, run_analysis, AnalysisConfig, CoefficientOrder, FlowDirectionGrid,
    MemoryRaster, PointerScheme, SeedSelection,
};

fn main() -> Result<()> {
    env_logger::init();

    let d8: Array2<u8> = array![
        [2, 4, 4, 8],
        [1, 2, 4, 8],
        [1, 1, 4, 16],
        [64, 1, 0, 16],
    ];
    let acc = flow_accumulation(&FlowDirectionGrid::new(d8.clone(), PointerScheme::Esri)?)?;

    // the reference rasters report their transform GDAL style, the candidate in affine order
    let geo = [-60.0, 0.25, 0.0, -10.0, 0.0, -0.25];
    let reference_acc = MemoryRaster::new(acc, geo, CoefficientOrder::Gdal);
    let reference_dir = MemoryRaster::new(d8, geo, CoefficientOrder::Gdal);
    let candidate_dir = MemoryRaster::new(
        array![[2u8, 4], [1, 0]],
        [0.5, 0.0, -60.0, 0.0, -0.5, -10.0],
        CoefficientOrder::Affine,
    );

    let config = AnalysisConfig {
        threshold: 1,
        selection: SeedSelection::Range(0, 2),
        compare_streams: true,
        ..Default::default()
    };
    let report = run_analysis(&reference_acc, &reference_dir, &candidate_dir, &config)?;

    println!("{} seeds, {} streams", report.seeds.len(), report.streams.len());
    println!("seed scores {:?}", report.seed_accuracy.scores());
    if let Some(streams) = &report.stream_accuracy {
        println!("stream scores {:?}", streams.scores());
    }

    Ok(())
}
