//! Standard walkable areas and spot layouts for the stock rooms.
//!
//! Rooms without a dedicated outline fall back to [`DEFAULT_AREA`]; rooms
//! without spots get an empty pool.

use std::collections::BTreeMap;
use std::sync::Arc;

use tundra_types::{ClothingSlot, RoomId, RoomSpot};

use crate::error::WorldError;
use crate::geometry::Polygon;
use crate::spots::RoomSpotPool;

/// Walkable rectangle used for rooms without a dedicated outline.
pub const DEFAULT_AREA: (f64, f64, f64, f64) = (190.0, 300.0, 530.0, 450.0);

/// Per-room walkable polygons and spot pools.
#[derive(Debug)]
pub struct RoomLayouts {
    areas: BTreeMap<RoomId, Polygon>,
    spots: BTreeMap<RoomId, Arc<RoomSpotPool>>,
    default_area: Polygon,
    no_spots: Arc<RoomSpotPool>,
}

impl Default for RoomLayouts {
    fn default() -> Self {
        let (left, top, right, bottom) = DEFAULT_AREA;
        Self {
            areas: BTreeMap::new(),
            spots: BTreeMap::new(),
            default_area: Polygon::rectangle(left, top, right, bottom),
            no_spots: Arc::new(RoomSpotPool::empty()),
        }
    }
}

impl RoomLayouts {
    /// Layouts with no room-specific data.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock room outlines and spot layouts.
    pub fn standard() -> Self {
        let mut layouts = Self::new();
        for &(room, coords) in STANDARD_AREAS {
            // The table is static; a malformed row only loses that room.
            if let Ok(polygon) = Polygon::from_coords(coords) {
                layouts.areas.insert(RoomId(room), polygon);
            }
        }
        for (room, spots) in standard_spots() {
            layouts
                .spots
                .insert(RoomId(room), Arc::new(RoomSpotPool::new(spots)));
        }
        layouts
    }

    /// Register a walkable outline for a room.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateRoom`] if the room already has one.
    pub fn with_area(mut self, room: RoomId, area: Polygon) -> Result<Self, WorldError> {
        if self.areas.contains_key(&room) {
            return Err(WorldError::DuplicateRoom(room));
        }
        self.areas.insert(room, area);
        Ok(self)
    }

    /// Register the spots of a room.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateRoom`] if the room already has spots.
    pub fn with_spots(
        mut self,
        room: RoomId,
        spots: impl IntoIterator<Item = RoomSpot>,
    ) -> Result<Self, WorldError> {
        if self.spots.contains_key(&room) {
            return Err(WorldError::DuplicateRoom(room));
        }
        self.spots.insert(room, Arc::new(RoomSpotPool::new(spots)));
        Ok(self)
    }

    /// Walkable outline of a room.
    pub fn area_for(&self, room: RoomId) -> &Polygon {
        self.areas.get(&room).unwrap_or(&self.default_area)
    }

    /// Spot pool of a room; shared by every bot in it.
    pub fn spots_for(&self, room: RoomId) -> Arc<RoomSpotPool> {
        Arc::clone(self.spots.get(&room).unwrap_or(&self.no_spots))
    }

    /// Rooms with at least one registered spot.
    pub fn rooms_with_spots(&self) -> impl Iterator<Item = RoomId> + '_ {
        self.spots.keys().copied()
    }
}

fn standard_spots() -> Vec<(u32, Vec<RoomSpot>)> {
    use ClothingSlot::{Body, Hand, Head};

    vec![
        (
            110,
            vec![
                RoomSpot::new(255, 188, 17, 1),
                RoomSpot::new(124, 241, 24, 1),
                RoomSpot::new(274, 250, 26, 2).wearing([(Body, 262)]),
                RoomSpot::new(224, 291, 26, 3).wearing([(Body, 262)]),
                RoomSpot::new(216, 190, 17, 3),
                RoomSpot::new(294, 186, 17, 3),
                RoomSpot::new(103, 262, 24, 3),
            ],
        ),
        (
            330,
            vec![
                RoomSpot::new(346, 368, 24, 1),
                RoomSpot::new(383, 331, 26, 2).wearing([(Body, 263), (Head, 424)]),
                RoomSpot::new(420, 365, 18, 2),
                RoomSpot::new(207, 309, 24, 2),
                RoomSpot::new(247, 283, 26, 3).wearing([(Body, 263), (Head, 424)]),
                RoomSpot::new(285, 309, 18, 3),
                RoomSpot::new(493, 351, 24, 3),
                RoomSpot::new(574, 349, 18, 3),
                RoomSpot::new(529, 316, 26, 4).wearing([(Body, 263), (Head, 424)]),
                RoomSpot::new(551, 212, 26, 4).wearing([(Hand, 343)]),
            ],
        ),
        (
            410,
            vec![
                RoomSpot::new(87, 225, 26, 1).wearing([(Hand, 340)]),
                RoomSpot::new(132, 313, 26, 1).wearing([(Hand, 233)]),
                RoomSpot::new(48, 326, 26, 1).wearing([(Hand, 234)]),
                RoomSpot::new(104, 354, 26, 1).wearing([(Body, 293)]),
                RoomSpot::new(185, 389, 22, 1),
                RoomSpot::new(367, 324, 19, 2),
                RoomSpot::new(185, 389, 22, 2),
                RoomSpot::new(462, 335, 22, 2),
            ],
        ),
        (
            810,
            vec![
                RoomSpot::new(296, 265, 18, 1),
                RoomSpot::new(260, 252, 18, 1),
                RoomSpot::new(448, 391, 26, 1).wearing([(Hand, 325)]),
                RoomSpot::new(563, 380, 26, 1).wearing([(Hand, 325)]),
                RoomSpot::new(337, 141, 17, 2),
                RoomSpot::new(136, 265, 24, 2),
                RoomSpot::new(137, 355, 22, 2),
            ],
        ),
    ]
}

#[rustfmt::skip]
static STANDARD_AREAS: &[(u32, &[(f64, f64)])] = &[
    (
        100,
        &[(135.0, 340.0), (165.0, 280.0), (306.0, 203.0), (457.0, 210.0), (573.0, 283.0), (635.0, 360.0), (605.0, 405.0), (180.0, 410.0)],
    ),
    (
        110,
        &[(501.0, 258.0), (445.25, 184.55), (202.15, 188.45), (162.6, 201.4), (88.85, 257.8), (0.0, 370.5), (0.0, 480.0), (668.0, 481.0)],
    ),
    (
        111,
        &[(311.0, 190.0), (235.0, 217.0), (129.9, 307.25), (59.0, 433.0), (687.0, 433.0), (568.95, 254.0), (504.0, 182.0), (459.95, 174.0), (352.0, 174.0)],
    ),
    (
        120,
        &[(660.0, 428.0), (519.75, 213.65), (421.7, 126.0), (247.1, 126.0), (186.85, 177.1), (121.0, 236.0), (0.0, 430.0)],
    ),
    (
        121,
        &[(616.0, 266.0), (190.0, 217.0), (134.0, 238.0), (0.0, 359.05), (0.0, 450.0), (760.0, 450.0), (760.0, 329.15), (703.95, 280.0)],
    ),
    (
        130,
        &[(353.0, 219.0), (0.0, 434.0), (0.0, 450.0), (760.0, 450.0), (605.95, 290.0)],
    ),
    (
        300,
        &[(579.65, 450.0), (676.5, 411.5), (729.15, 342.75), (694.2, 276.8), (634.5, 254.5), (536.2, 225.9), (514.2, 224.5), (328.5, 224.5), (148.5, 265.5), (94.5, 380.5), (146.0, 450.0)],
    ),
    (
        310,
        &[(760.0, 292.05), (659.5, 232.5), (483.5, 181.5), (327.0, 217.0), (0.0, 348.8), (0.0, 450.0), (760.0, 450.0), (760.0, 292.05)],
    ),
    (
        320,
        &[(477.75, 289.95), (453.55, 286.0), (124.9, 286.0), (0.0, 354.55), (0.0, 450.0), (760.0, 450.0), (760.0, 348.5), (536.9, 313.7), (512.75, 309.4), (494.2, 299.55)],
    ),
    (
        321,
        &[(510.95, 403.0), (629.2, 403.0), (554.05, 313.0), (449.95, 313.0), (432.6, 289.0), (347.0, 289.0), (329.65, 313.0), (256.0, 313.0), (184.0, 330.0), (86.9, 330.0), (7.0, 379.65), (7.0, 413.0), (162.5, 413.0), (197.0, 403.0), (274.0, 403.0)],
    ),
    (
        330,
        &[(119.5, 450.0), (760.0, 450.0), (760.0, 221.75), (680.5, 174.5), (567.35, 175.05), (487.5, 208.5), (352.5, 208.5), (312.5, 221.5), (164.5, 208.5), (149.5, 208.5), (119.5, 221.5)],
    ),
    (
        200,
        &[(671.0, 235.0), (664.0, 230.0), (587.0, 239.0), (557.0, 233.6), (462.95, 197.8), (214.0, 200.0), (177.0, 325.0), (112.0, 390.0), (112.0, 450.0), (689.95, 450.0), (689.95, 341.4)],
    ),
    (
        210,
        &[(353.0, 219.0), (0.0, 434.0), (0.0, 450.0), (760.0, 450.0), (605.95, 290.0)],
    ),
    (
        220,
        &[(623.45, 223.05), (406.1, 223.05), (250.1, 213.05), (228.05, 213.05), (0.0, 347.9), (0.0, 450.0), (760.0, 450.0), (760.0, 342.65)],
    ),
    (
        221,
        &[(628.95, 363.0), (652.95, 314.0), (545.95, 271.0), (318.95, 271.0), (136.95, 295.05), (137.6, 343.35), (152.3, 480.05), (628.95, 480.05)],
    ),
    (
        230,
        &[(595.5, 224.5), (498.5, 126.5), (371.5, 117.5), (206.5, 157.5), (95.75, 270.05), (96.5, 270.5), (206.5, 344.5), (367.5, 374.5), (496.5, 365.5), (585.5, 313.5), (596.5, 224.5), (595.5, 224.5)],
    ),
    (
        801,
        &[(760.0, 203.55), (675.3, 172.5), (538.3, 158.85), (320.0, 169.1), (207.3, 200.9), (121.0, 204.0), (115.0, 255.0), (115.0, 301.0), (76.0, 337.0), (63.0, 392.0), (0.0, 432.8), (760.0, 432.8)],
    ),
    (
        802,
        &[(417.95, 148.0), (338.95, 86.0), (175.0, 165.0), (111.0, 234.0), (114.0, 325.0), (222.0, 391.0), (377.0, 418.0), (645.95, 362.0), (681.0, 265.0), (618.95, 170.0)],
    ),
    (
        804,
        &[(760.0, 392.05), (489.0, 287.75), (376.85, 287.75), (260.5, 306.65), (200.75, 360.6), (141.0, 450.0), (760.0, 450.0)],
    ),
    (
        800,
        &[(570.5, 89.5), (262.5, 74.5), (172.9, 129.25), (33.5, 265.5), (79.5, 401.5), (179.5, 427.5), (286.0, 388.0), (317.5, 416.5), (393.5, 416.5), (460.5, 443.5), (526.5, 419.5), (617.5, 419.5), (677.1, 317.25), (676.55, 309.6), (702.5, 240.5), (702.5, 145.5), (601.95, 121.35)],
    ),
    (
        400,
        &[(648.85, 334.25), (666.55, 303.35), (642.0, 223.0), (616.85, 208.4), (551.2, 194.15), (521.65, 164.7), (507.35, 148.4), (497.75, 140.05), (366.3, 150.5), (250.7, 195.25), (164.5, 203.9), (76.9, 191.45), (41.55, 225.4), (23.65, 286.35), (39.25, 302.6), (153.4, 342.4), (186.8, 353.9), (218.9, 366.0), (276.9, 401.0), (326.95, 428.2), (419.9, 439.3), (550.0, 401.0)],
    ),
    (
        410,
        &[(0.0, 450.0), (760.0, 450.0), (760.0, 316.8), (646.95, 326.9), (585.55, 307.95), (556.35, 305.3), (533.9, 299.5), (503.0, 282.9), (412.6, 248.15), (338.4, 227.2), (181.55, 243.35), (113.15, 229.1), (71.5, 224.45), (0.0, 260.0)],
    ),
    (
        809,
        &[(631.95, 155.15), (424.95, 131.0), (359.3, 134.25), (237.4, 142.9), (62.8, 163.95), (53.2, 206.0), (58.1, 267.55), (65.2, 326.25), (121.55, 386.4), (311.85, 422.6), (494.4, 480.0), (635.85, 480.0), (690.75, 395.1), (690.75, 178.25)],
    ),
    (
        805,
        &[(515.2, 172.6), (487.55, 168.95), (374.6, 139.95), (297.35, 107.15), (256.8, 86.85), (219.15, 86.85), (174.75, 107.2), (122.6, 153.5), (104.25, 185.35), (47.3, 260.65), (37.65, 300.25), (124.55, 337.9), (294.45, 368.8), (481.75, 351.4), (610.15, 302.15), (642.65, 265.55), (701.0, 209.85), (515.2, 172.6)],
    ),
    (
        810,
        &[(723.8, 222.4), (644.25, 185.4), (576.2, 176.9), (556.85, 158.2), (520.95, 147.0), (420.95, 150.0), (376.2, 144.75), (340.8, 133.4), (307.5, 133.4), (273.0, 164.0), (223.0, 192.0), (212.0, 216.0), (112.0, 226.15), (60.3, 311.95), (112.0, 384.15), (143.3, 406.5), (245.0, 454.95), (255.45, 480.0), (639.2, 480.0), (760.0, 397.8), (760.0, 290.7)],
    ),
    (
        806,
        &[(690.7, 288.35), (591.35, 270.3), (428.25, 256.05), (275.4, 262.4), (221.0, 237.7), (220.75, 237.55), (207.1, 234.45), (184.95, 236.8), (177.15, 241.1), (172.65, 250.2), (166.0, 259.05), (154.2, 267.05), (139.2, 274.55), (121.9, 278.55), (112.5, 281.85), (110.4, 282.15), (36.2, 343.95), (76.95, 404.0), (161.15, 450.0), (710.4, 450.0), (691.65, 423.2)],
    ),
    (
        808,
        &[(760.0, 280.0), (671.95, 242.0), (581.95, 185.0), (471.95, 148.0), (253.95, 174.0), (0.0, 290.0), (0.0, 420.95), (167.95, 450.0), (760.0, 450.0)],
    ),
    (
        807,
        &[(475.85, 271.1), (331.15, 226.55), (113.3, 187.95), (99.2, 306.2), (99.2, 306.2), (140.1, 355.75), (164.0, 400.0), (164.0, 480.0), (464.9, 480.0), (628.7, 425.35), (663.7, 393.5), (760.0, 357.55), (760.0, 272.0)],
    ),
    (
        420,
        &[(417.95, 357.0), (545.95, 353.0), (710.95, 205.0), (468.95, 175.0), (111.0, 175.0), (49.0, 286.0), (108.0, 324.0), (227.95, 357.0)],
    ),
    (
        423,
        &[(485.25, 208.45), (437.8, 204.75), (335.35, 205.35), (268.65, 275.65), (219.35, 300.0), (220.15, 358.7), (338.2, 383.15), (432.85, 382.4), (486.1, 373.45), (576.75, 340.0), (584.95, 332.55), (598.5, 313.85), (602.45, 289.5), (599.7, 260.5), (590.15, 222.9), (581.8, 208.85), (545.25, 199.8), (502.7, 210.9)],
    ),
    (
        421,
        &[(671.95, 285.0), (628.95, 235.0), (143.1, 235.0), (113.0, 315.0), (47.35, 360.3), (47.35, 450.0), (671.95, 450.0)],
    ),
    (
        422,
        &[(155.0, 310.0), (55.0, 349.0), (0.0, 408.85), (0.0, 480.0), (741.95, 480.0), (706.95, 337.0), (590.95, 310.0), (477.7, 284.65), (281.0, 275.0)],
    ),
];

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use tundra_types::Position;

    use super::*;

    #[test]
    fn standard_covers_every_stock_room() {
        let layouts = RoomLayouts::standard();
        assert_eq!(layouts.areas.len(), STANDARD_AREAS.len());
        let rooms: Vec<_> = layouts.rooms_with_spots().map(RoomId::get).collect();
        assert_eq!(rooms, vec![110, 330, 410, 810]);
        assert_eq!(layouts.spots_for(RoomId(330)).capacity(), 10);
    }

    #[test]
    fn unknown_room_uses_defaults() {
        let layouts = RoomLayouts::standard();
        let mut rng = SmallRng::seed_from_u64(3);
        let p = layouts.area_for(RoomId(999)).sample(&mut rng);
        assert!((190..=530).contains(&p.x));
        assert!((300..=450).contains(&p.y));
        assert_eq!(layouts.spots_for(RoomId(999)).capacity(), 0);
    }

    #[test]
    fn spot_pools_are_shared_per_room() {
        let layouts = RoomLayouts::standard();
        let a = layouts.spots_for(RoomId(110));
        let b = layouts.spots_for(RoomId(110));
        assert!(Arc::ptr_eq(&a, &b));
        let first = a.tier(1).first().map(|s| s.position);
        assert_eq!(first, Some(Position::new(255, 188)));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let result = RoomLayouts::new()
            .with_spots(RoomId(1), [RoomSpot::new(0, 0, 18, 1)])
            .and_then(|l| l.with_spots(RoomId(1), []));
        assert!(matches!(result, Err(WorldError::DuplicateRoom(RoomId(1)))));
    }
}
