//! Randomized cross-checks of the tree against brute force over all points.

use point_quadtree::{
    AttrValue, Point, PointId, Quadtree, QuadtreeConfig, QuadtreeVisitor, Rectangle,
};
use proptest::prelude::*;

const SIDE: f64 = 1000.0;

fn boundary() -> Rectangle {
    Rectangle::new(SIDE / 2.0, SIDE / 2.0, SIDE, SIDE)
}

/// Coordinates mix free floats with a coarse grid so that coincident points
/// and points on split lines show up regularly.
fn coord() -> impl Strategy<Value = f64> {
    prop_oneof![
        0.0..=SIDE,
        (0u32..=8).prop_map(|i| f64::from(i) * SIDE / 8.0),
    ]
}

fn coords() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((coord(), coord()), 0..200)
}

fn rect() -> impl Strategy<Value = Rectangle> {
    (-100.0..SIDE + 100.0, -100.0..SIDE + 100.0, 0.0..600.0, 0.0..600.0)
        .prop_map(|(cx, cy, w, h)| Rectangle::new(cx, cy, w, h))
}

fn build(coords: &[(f64, f64)], capacity: usize, max_depth: u8) -> Quadtree {
    let config = QuadtreeConfig::new(boundary(), capacity).with_max_depth(max_depth);
    let mut qt = Quadtree::from_config(&config).unwrap();
    for (i, &(x, y)) in coords.iter().enumerate() {
        let id = i64::try_from(i).unwrap();
        assert!(qt.insert(Point::new(x, y).with_attribute("id", id)));
    }
    qt
}

fn ids(points: &[&Point]) -> Vec<i64> {
    let mut ids: Vec<i64> = points
        .iter()
        .map(|p| match p.attribute("id") {
            Some(AttrValue::Int(id)) => *id,
            other => panic!("point without id: {other:?}"),
        })
        .collect();
    ids.sort_unstable();
    ids
}

fn brute_nearest(coords: &[(f64, f64)], query: &Point, skip: Option<usize>) -> Option<f64> {
    coords
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != skip)
        .map(|(_, &(x, y))| query.distance_to(&Point::new(x, y)))
        .min_by(f64::total_cmp)
}

/// Records, for every point the traversal reports, whether the leaf it was
/// reported under contains it.
#[derive(Default)]
struct LeafResidency {
    boundary: Option<Rectangle>,
    seen: usize,
    outside: Vec<(f64, f64, Rectangle)>,
}

impl QuadtreeVisitor for LeafResidency {
    fn point(&mut self, _id: PointId, point: &Point) {
        self.seen += 1;
        match self.boundary {
            Some(boundary) if boundary.contains(point) => {}
            Some(boundary) => self.outside.push((point.x, point.y, boundary)),
            None => panic!("point reported before any leaf"),
        }
    }

    fn leaf(&mut self, _depth: u8, boundary: &Rectangle, _len: usize) {
        self.boundary = Some(*boundary);
    }

    fn branch(&mut self, _depth: u8, _boundary: &Rectangle) {
        self.boundary = None;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn count_matches_accepted_inserts(
        coords in coords(),
        capacity in 1usize..6,
        max_depth in 0u8..12,
    ) {
        let qt = build(&coords, capacity, max_depth);
        prop_assert_eq!(qt.count_points(), coords.len());
        prop_assert_eq!(qt.len(), coords.len());
        prop_assert_eq!(qt.stats().points, coords.len());
        prop_assert!(qt.stats().depth <= max_depth);
    }

    #[test]
    fn points_live_in_leaves_that_contain_them(
        coords in coords(),
        capacity in 1usize..6,
        max_depth in prop_oneof![0u8..=16, any::<u8>()],
    ) {
        let qt = build(&coords, capacity, max_depth);
        let mut residency = LeafResidency::default();
        qt.traverse(&mut residency);
        prop_assert_eq!(residency.seen, coords.len());
        prop_assert!(residency.outside.is_empty(), "outside their leaf: {:?}", residency.outside);
    }

    #[test]
    fn root_range_returns_every_point_once(coords in coords(), capacity in 1usize..6) {
        let qt = build(&coords, capacity, 16);
        let expected: Vec<i64> = (0..coords.len() as i64).collect();
        prop_assert_eq!(ids(&qt.query_range(&boundary())), expected.clone());
        prop_assert_eq!(ids(&qt.get_all_points()), expected);
    }

    #[test]
    fn range_matches_brute_force(coords in coords(), capacity in 1usize..6, r in rect()) {
        let qt = build(&coords, capacity, 16);
        let all = qt.get_all_points();
        let expected: Vec<&Point> = all.iter().copied().filter(|p| r.contains(p)).collect();
        prop_assert_eq!(ids(&qt.query_range(&r)), ids(&expected));
    }

    #[test]
    fn nearest_matches_brute_force(
        coords in coords(),
        capacity in 1usize..6,
        qx in -200.0..SIDE + 200.0,
        qy in -200.0..SIDE + 200.0,
    ) {
        let qt = build(&coords, capacity, 16);
        let query = Point::new(qx, qy);
        let found = qt.nearest_neighbor_with_distance(&query).map(|(p, d)| {
            assert_eq!(p.distance_to(&query), d);
            d
        });
        prop_assert_eq!(found, brute_nearest(&coords, &query, None));
    }

    #[test]
    fn nearest_of_stored_point_excludes_itself(
        coords in prop::collection::vec((coord(), coord()), 1..120),
        capacity in 1usize..6,
        pick in any::<prop::sample::Index>(),
    ) {
        let qt = build(&coords, capacity, 16);
        let i = pick.index(coords.len());
        let stored = qt
            .filter_by_attribute("id", i64::try_from(i).unwrap())
            .pop()
            .unwrap();
        let found = qt.nearest_neighbor_with_distance(stored).map(|(p, d)| {
            assert!(!std::ptr::eq(p, stored));
            d
        });
        prop_assert_eq!(found, brute_nearest(&coords, stored, Some(i)));
    }

    #[test]
    fn out_of_bounds_inserts_are_rejected(
        coords in coords(),
        x in prop_oneof![-500.0..-0.001, SIDE + 0.001..SIDE + 500.0],
        y in 0.0..=SIDE,
    ) {
        let mut qt = build(&coords, 3, 16);
        prop_assert!(!qt.insert(Point::new(x, y)));
        prop_assert!(!qt.insert(Point::new(y, x)));
        prop_assert_eq!(qt.count_points(), coords.len());
    }

    #[test]
    fn reads_are_idempotent(coords in coords(), capacity in 1usize..6) {
        let qt = build(&coords, capacity, 16);
        prop_assert_eq!(qt.get_all_points(), qt.get_all_points());
    }
}
