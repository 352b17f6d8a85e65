mod common;

#[cfg(test)]
mod tests {
    use super::common::{d8_from_dem, lumpy_dem};
    use approx::assert_relative_eq;
    use drainage_tree::{
        build_tree, compare, compare_range, compare_streams, flow_accumulation, CoefficientOrder,
        CompareParams, DistanceMetric, Error, FlowDirectionGrid, FlowSurface, GeoTransform,
        PointerScheme, SeedComparison, TreeParams,
    };
    use ndarray::{Array2, array};

    fn esri(data: Array2<u8>) -> FlowDirectionGrid {
        FlowDirectionGrid::new(data, PointerScheme::Esri).unwrap()
    }

    /// 4x4 unit cells: rows run east into the last column, which runs south to a sink.
    fn fine() -> FlowDirectionGrid {
        esri(array![
            [1, 1, 1, 4],
            [1, 1, 1, 4],
            [1, 1, 1, 4],
            [1, 1, 1, 0],
        ])
    }

    fn fine_gt() -> GeoTransform {
        GeoTransform::new(0.0, 4.0, 1.0, -1.0)
    }

    fn coarse_gt() -> GeoTransform {
        GeoTransform::new(0.0, 4.0, 2.0, -2.0)
    }

    #[test]
    fn test_self_comparison_is_perfect() {
        let dir = d8_from_dem(&lumpy_dem(30, 30));
        let acc = flow_accumulation(&dir).unwrap();
        let (_, seeds) = build_tree(&acc, &dir, &TreeParams::new(2)).unwrap();
        let gt = GeoTransform::new(30.0, -10.0, 0.25, -0.25);
        let surface = FlowSurface::new(&dir, gt);

        let params = CompareParams::default();
        let report = compare(&surface, &surface, seeds.as_slice(), &params).unwrap();
        assert_eq!(report.seeds.len(), seeds.len());
        assert_eq!(report.matched(), seeds.len());
        for (k, s) in report.seeds.iter().enumerate() {
            assert_eq!(s.index, k);
            assert_eq!(s.score(), Some(1.0));
        }
    }

    #[test]
    fn test_seed_index_out_of_range() {
        let dir = esri(array![[1, 1, 4], [1, 1, 0]]);
        let acc = flow_accumulation(&dir).unwrap();
        let (_, seeds) = build_tree(&acc, &dir, &TreeParams::new(0)).unwrap();
        assert_eq!(seeds.len(), 3);
        let surface = FlowSurface::new(&dir, GeoTransform::default());
        assert_eq!(
            compare_range(&surface, &surface, &seeds, 5..6, &CompareParams::default()),
            Err(Error::SeedOutOfRange { index: 5, len: 3 })
        );

        let report =
            compare_range(&surface, &surface, &seeds, 1..3, &CompareParams::default()).unwrap();
        let indices: Vec<_> = report.seeds.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_coarser_grid_that_agrees() {
        let fine = fine();
        let coarse = esri(array![[1, 4], [1, 0]]);
        let acc = flow_accumulation(&fine).unwrap();
        let (_, seeds) = build_tree(&acc, &fine, &TreeParams::new(0)).unwrap();
        let a = FlowSurface::new(&fine, fine_gt());
        let b = FlowSurface::new(&coarse, coarse_gt());

        let report = compare(&a, &b, seeds.as_slice(), &CompareParams::default()).unwrap();
        assert_eq!(report.matched(), seeds.len());
        assert_eq!(report.mean_score(), Some(1.0));
    }

    #[test]
    fn test_coarser_grid_that_diverges() {
        let fine = fine();
        // the top-left coarse cell drains south instead of east
        let coarse = esri(array![[4, 4], [1, 0]]);
        let acc = flow_accumulation(&fine).unwrap();
        let (_, seeds) = build_tree(&acc, &fine, &TreeParams::new(0)).unwrap();
        let a = FlowSurface::new(&fine, fine_gt());
        let b = FlowSurface::new(&coarse, coarse_gt());

        let first = seeds.select(0..1).unwrap();
        assert_eq!(first[0].cell(), (0, 0));
        let report = compare(&a, &b, first, &CompareParams::default()).unwrap();
        let SeedComparison::Matched(agreement) = &report.seeds[0].outcome else {
            panic!("seed should be matched");
        };
        assert_eq!(agreement.steps, 7);
        assert_eq!(agreement.matched, 4);
        assert_eq!(agreement.candidate_steps, 3);
        assert_relative_eq!(agreement.score, 4.0 / 7.0);

        // a single step stays inside the coarse cell both grids agree on
        let short = CompareParams { max_steps: Some(1), ..Default::default() };
        let report = compare(&a, &b, first, &short).unwrap();
        assert_eq!(report.scores(), vec![Some(1.0)]);
    }

    #[test]
    fn test_seeds_outside_candidate_are_not_matched() {
        let fine = fine();
        // candidate only covers the western half
        let half = esri(array![[4], [0]]);
        let acc = flow_accumulation(&fine).unwrap();
        let (_, seeds) = build_tree(&acc, &fine, &TreeParams::new(0)).unwrap();
        assert_eq!(seeds.len(), 7);
        let a = FlowSurface::new(&fine, fine_gt());
        let b = FlowSurface::new(&half, coarse_gt());

        let report = compare(&a, &b, seeds.as_slice(), &CompareParams::default()).unwrap();
        assert_eq!(report.seeds.len(), 7);
        assert_eq!(report.matched(), 4);
        for s in &report.seeds {
            if s.cell.1 == 3 {
                assert!(matches!(
                    &s.outcome,
                    SeedComparison::NoMatch(Error::CoordinateOutOfBounds { seed, .. }) if *seed == s.index
                ));
            } else {
                // the first two cells of each row lie in the candidate
                assert_relative_eq!(s.score().unwrap(), 2.0 / (7.0 - s.cell.0 as f64));
            }
        }
    }

    #[test]
    fn test_seed_on_nodata_is_not_matched() {
        let a_dir = esri(array![[1, 0]]);
        let b_dir = esri(array![[255, 0]]);
        let acc = flow_accumulation(&a_dir).unwrap();
        let (_, seeds) = build_tree(&acc, &a_dir, &TreeParams::new(0)).unwrap();
        let gt = GeoTransform::default();
        let report = compare(
            &FlowSurface::new(&a_dir, gt),
            &FlowSurface::new(&b_dir, gt),
            seeds.as_slice(),
            &CompareParams::default(),
        )
        .unwrap();
        assert_eq!(report.matched(), 0);
        assert_eq!(report.mean_score(), None);
    }

    #[test]
    fn test_cycle_in_candidate_aborts() {
        let a_dir = esri(array![[1, 0]]);
        let b_dir = esri(array![[1, 16]]);
        let acc = flow_accumulation(&a_dir).unwrap();
        let (_, seeds) = build_tree(&acc, &a_dir, &TreeParams::new(0)).unwrap();
        let gt = GeoTransform::default();
        assert!(matches!(
            compare(
                &FlowSurface::new(&a_dir, gt),
                &FlowSurface::new(&b_dir, gt),
                seeds.as_slice(),
                &CompareParams::default(),
            ),
            Err(Error::CyclicFlowPath { .. })
        ));
    }

    #[test]
    fn test_transform_orders_give_same_result() {
        let fine = fine();
        let coarse = esri(array![[4, 4], [1, 0]]);
        let acc = flow_accumulation(&fine).unwrap();
        let (_, seeds) = build_tree(&acc, &fine, &TreeParams::new(0)).unwrap();
        let a = FlowSurface::new(&fine, fine_gt());

        let gdal = [0.0, 2.0, 0.0, 4.0, 0.0, -2.0];
        let affine = [2.0, 0.0, 0.0, 0.0, -2.0, 4.0];
        let gdal = GeoTransform::from_coefficients(&gdal, CoefficientOrder::Gdal).unwrap();
        let affine = GeoTransform::from_coefficients(&affine, CoefficientOrder::Affine).unwrap();
        let params = CompareParams::default();
        let r1 = compare(&a, &FlowSurface::new(&coarse, gdal), seeds.as_slice(), &params).unwrap();
        let r2 = compare(&a, &FlowSurface::new(&coarse, affine), seeds.as_slice(), &params).unwrap();
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_streams_against_coarse_grid() {
        let fine = fine();
        let coarse = esri(array![[4, 4], [1, 0]]);
        let acc = flow_accumulation(&fine).unwrap();
        let params = TreeParams::new(0).with_transform(fine_gt());
        let (tree, _) = build_tree(&acc, &fine, &params).unwrap();
        let streams = tree.streams(DistanceMetric::Planar);

        let heads: Vec<_> = streams.iter().map(|s| (s.head, s.mouth, s.cells)).collect();
        assert_eq!(
            heads,
            vec![
                ((0, 0), (3, 3), 7),
                ((1, 0), (1, 2), 3),
                ((2, 0), (2, 2), 3),
                ((3, 0), (3, 2), 3),
            ]
        );
        assert_relative_eq!(streams.get(1).unwrap().length, 6.0);

        let a = FlowSurface::new(&fine, fine_gt());
        let b = FlowSurface::new(&coarse, coarse_gt());
        let report = compare_streams(&a, &b, streams.as_slice(), &CompareParams::default()).unwrap();
        let scores: Vec<f64> = report.scores().into_iter().map(Option::unwrap).collect();
        assert_relative_eq!(scores[0], 4.0 / 7.0);
        assert_relative_eq!(scores[1], 2.0 / 3.0);
        assert_relative_eq!(scores[2], 1.0);
        assert_relative_eq!(scores[3], 1.0);

        let itself = compare_streams(&a, &a, streams.as_slice(), &CompareParams::default()).unwrap();
        assert_eq!(itself.mean_score(), Some(1.0));
    }
}
