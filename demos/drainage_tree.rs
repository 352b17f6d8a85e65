use anyhow::Result;
use ndarray::{Array2, array};
use drainage_tree::{
    build_tree, flow_accumulation, DistanceMetric, FlowDirectionGrid, GeoTransform,
    PointerScheme, TreeParams,
};

fn main() -> Result<()> {
    env_logger::init();

    let d8: Array2<u8> = array![
        [2, 4, 4, 8],
        [1, 2, 4, 8],
        [1, 1, 4, 16],
        [64, 1, 0, 16],
    ];
    let dir = FlowDirectionGrid::new(d8, PointerScheme::Esri)?;
    let acc = flow_accumulation(&dir)?;
    println!("Accumulation is {acc}");

    // 30 arc-second cells somewhere in South America
    let geo = GeoTransform::new(-60.0, -10.0, 1.0 / 120.0, -1.0 / 120.0);
    let params = TreeParams::new(2).with_transform(geo);
    let (tree, seeds) = build_tree(&acc, &dir, &params)?;
    println!("{} cells drain to {} outlets", tree.len(), tree.roots().len());
    for (k, s) in seeds.iter().enumerate() {
        println!("seed {k}: {:?} at {:?}, accumulation {}", s.kind, s.cell(), s.accumulation);
    }

    let streams = tree.streams(DistanceMetric::Geodesic);
    for s in streams.iter() {
        println!(
            "stream {}: {:?} -> {:?}, {} cells, {:.0} m",
            s.id, s.head, s.mouth, s.cells, s.length
        );
    }
    println!("Stream labels are {}", streams.labels());

    Ok(())
}
