pub mod geometry {
    use std::ops::{Add, Mul, Neg, Sub};

    use glam::{DMat3, DVec2};
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，使用世界坐标（单位：格）。
    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        pub const ORIGIN: Point2 = Point2(DVec2::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn distance_squared(self, other: Point2) -> f64 {
            self.0.distance_squared(other.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        /// 以原点为起点的位置向量。
        #[inline]
        pub fn to_vector(self) -> Vector2 {
            Vector2(self.0)
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量，用于位移、尺寸与方向。
    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        pub const ZERO: Vector2 = Vector2(DVec2::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn scale(self, factor: f64) -> Self {
            Self(self.0 * factor)
        }

        #[inline]
        pub fn round(self) -> Self {
            Self(self.0.round())
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    impl Add for Vector2 {
        type Output = Vector2;

        fn add(self, rhs: Vector2) -> Vector2 {
            Vector2(self.0 + rhs.0)
        }
    }

    impl Sub for Vector2 {
        type Output = Vector2;

        fn sub(self, rhs: Vector2) -> Vector2 {
            Vector2(self.0 - rhs.0)
        }
    }

    impl Neg for Vector2 {
        type Output = Vector2;

        fn neg(self) -> Vector2 {
            Vector2(-self.0)
        }
    }

    /// 轴对齐矩形，以最小/最大角点存储。所有碰撞判定均为闭区间：边缘相接即视为相交。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Rect {
        min: Point2,
        max: Point2,
    }

    impl Default for Rect {
        fn default() -> Self {
            Self::empty()
        }
    }

    impl Rect {
        /// 由左上角与宽高构造，宽高为负时自动归一化。
        #[inline]
        pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
            Self::from_corners(Point2::new(x, y), Point2::new(x + width, y + height))
        }

        /// 由任意两个对角点构造。
        #[inline]
        pub fn from_corners(a: Point2, b: Point2) -> Self {
            Self {
                min: Point2::from_vec(a.0.min(b.0)),
                max: Point2::from_vec(a.0.max(b.0)),
            }
        }

        /// 空矩形，作为 `include_*` 累加的起点。
        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn x(&self) -> f64 {
            self.min.x()
        }

        #[inline]
        pub fn y(&self) -> f64 {
            self.min.y()
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        #[inline]
        pub fn top_left(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn bottom_right(&self) -> Point2 {
            self.max
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            self.min = Point2::from_vec(self.min.0.min(point.0));
            self.max = Point2::from_vec(self.max.0.max(point.0));
        }

        pub fn include_rect(&mut self, other: &Rect) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            Point2::from_vec((self.min.0 + self.max.0) * 0.5)
        }

        #[inline]
        pub fn translate(&self, offset: Vector2) -> Rect {
            Rect {
                min: self.min.translate(offset),
                max: self.max.translate(offset),
            }
        }

        /// 点在矩形内（含边界）。
        #[inline]
        pub fn contains_point(&self, point: Point2) -> bool {
            point.x() >= self.min.x()
                && point.x() <= self.max.x()
                && point.y() >= self.min.y()
                && point.y() <= self.max.y()
        }

        /// `other` 完全落在矩形内（含边界）。
        #[inline]
        pub fn contains_rect(&self, other: &Rect) -> bool {
            !other.is_empty() && self.contains_point(other.min) && self.contains_point(other.max)
        }

        /// 两矩形相交（含边缘相接）。
        #[inline]
        pub fn overlaps(&self, other: &Rect) -> bool {
            if self.is_empty() || other.is_empty() {
                return false;
            }
            self.min.x() <= other.max.x()
                && other.min.x() <= self.max.x()
                && self.min.y() <= other.max.y()
                && other.min.y() <= self.max.y()
        }

        /// 线段与矩形相交（含端点落在边上的情形）。
        pub fn overlaps_segment(&self, start: Point2, end: Point2) -> bool {
            if self.is_empty() {
                return false;
            }
            if self.contains_point(start) || self.contains_point(end) {
                return true;
            }
            let corners = [
                self.min,
                Point2::new(self.max.x(), self.min.y()),
                self.max,
                Point2::new(self.min.x(), self.max.y()),
            ];
            (0..4).any(|i| segments_intersect(start, end, corners[i], corners[(i + 1) % 4]))
        }
    }

    fn orientation(a: Point2, b: Point2, c: Point2) -> f64 {
        a.vector_to(b).0.perp_dot(a.vector_to(c).0)
    }

    fn on_segment(a: Point2, b: Point2, p: Point2) -> bool {
        p.x() >= a.x().min(b.x())
            && p.x() <= a.x().max(b.x())
            && p.y() >= a.y().min(b.y())
            && p.y() <= a.y().max(b.y())
    }

    /// 闭线段相交判定，共线重叠与端点接触都算相交。
    pub fn segments_intersect(p1: Point2, p2: Point2, q1: Point2, q2: Point2) -> bool {
        let d1 = orientation(q1, q2, p1);
        let d2 = orientation(q1, q2, p2);
        let d3 = orientation(p1, p2, q1);
        let d4 = orientation(p1, p2, q2);

        if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
            && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
        {
            return true;
        }

        (d1 == 0.0 && on_segment(q1, q2, p1))
            || (d2 == 0.0 && on_segment(q1, q2, p2))
            || (d3 == 0.0 && on_segment(p1, p2, q1))
            || (d4 == 0.0 && on_segment(p1, p2, q2))
    }

    /// 二维仿射矩阵（齐次 3x3）。链式调用按从左到右右乘：
    /// `Matrix::translation(t).rotate(r)` 作用于点时先旋转再平移。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Matrix(pub DMat3);

    impl Default for Matrix {
        fn default() -> Self {
            Self::IDENTITY
        }
    }

    impl Matrix {
        pub const IDENTITY: Matrix = Matrix(DMat3::IDENTITY);

        #[inline]
        pub fn translation(offset: Vector2) -> Self {
            Self(DMat3::from_translation(offset.0))
        }

        /// 按角度旋转；90 的整数倍走精确分支，避免三角函数带来的舍入误差。
        pub fn rotation(degrees: i32) -> Self {
            let m = match degrees.rem_euclid(360) {
                0 => DMat3::IDENTITY,
                90 => DMat3::from_cols(
                    glam::DVec3::new(0.0, 1.0, 0.0),
                    glam::DVec3::new(-1.0, 0.0, 0.0),
                    glam::DVec3::Z,
                ),
                180 => DMat3::from_cols(
                    glam::DVec3::new(-1.0, 0.0, 0.0),
                    glam::DVec3::new(0.0, -1.0, 0.0),
                    glam::DVec3::Z,
                ),
                270 => DMat3::from_cols(
                    glam::DVec3::new(0.0, -1.0, 0.0),
                    glam::DVec3::new(1.0, 0.0, 0.0),
                    glam::DVec3::Z,
                ),
                other => DMat3::from_angle(f64::from(other).to_radians()),
            };
            Self(m)
        }

        #[inline]
        pub fn rotation_radians(angle: f64) -> Self {
            Self(DMat3::from_angle(angle))
        }

        #[inline]
        pub fn scaling(factor: Vector2) -> Self {
            Self(DMat3::from_scale(factor.0))
        }

        #[inline]
        pub fn mult(self, right: Matrix) -> Self {
            Self(self.0 * right.0)
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            self.mult(Self::translation(offset))
        }

        #[inline]
        pub fn rotate(self, degrees: i32) -> Self {
            self.mult(Self::rotation(degrees))
        }

        #[inline]
        pub fn rotate_radians(self, angle: f64) -> Self {
            self.mult(Self::rotation_radians(angle))
        }

        #[inline]
        pub fn scale(self, factor: Vector2) -> Self {
            self.mult(Self::scaling(factor))
        }

        #[inline]
        pub fn apply(&self, point: Point2) -> Point2 {
            Point2(self.0.transform_point2(point.0))
        }

        /// 变换矩形的两个对角点并重新归一化，仅对 90 度倍数旋转保持精确。
        #[inline]
        pub fn apply_rect(&self, rect: &Rect) -> Rect {
            Rect::from_corners(self.apply(rect.min()), self.apply(rect.max()))
        }
    }

    impl Mul for Matrix {
        type Output = Matrix;

        fn mul(self, rhs: Matrix) -> Matrix {
            self.mult(rhs)
        }
    }

    /// 网格吸附。`step` 为 0 时关闭吸附。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Grid {
        pub step: f64,
    }

    impl Default for Grid {
        fn default() -> Self {
            Self { step: 1.0 }
        }
    }

    impl Grid {
        #[inline]
        pub fn new(step: f64) -> Self {
            Self { step }
        }

        #[inline]
        pub fn is_enabled(&self) -> bool {
            self.step > 0.0
        }

        #[inline]
        pub fn snap_scalar(&self, value: f64) -> f64 {
            if self.is_enabled() {
                self.step * (value / self.step).round()
            } else {
                value
            }
        }

        #[inline]
        pub fn snap(&self, point: Point2) -> Point2 {
            Point2::new(self.snap_scalar(point.x()), self.snap_scalar(point.y()))
        }

        #[inline]
        pub fn snap_vector(&self, vector: Vector2) -> Vector2 {
            Vector2::new(self.snap_scalar(vector.x()), self.snap_scalar(vector.y()))
        }

        /// 方向键微移使用的单位步长；关闭吸附时退化为 1。
        #[inline]
        pub fn nudge_step(&self) -> f64 {
            if self.is_enabled() { self.step } else { 1.0 }
        }
    }

}

pub mod catalog {
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Point2, Rect, Vector2};

    /// 单个建筑可声明的传送带/管道接口上限。
    pub const MAX_CONNECTORS: usize = 4;

    /// 建筑上的接口（传送带或管道口），坐标相对建筑左上角。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Connector {
        pub pos: Point2,
        #[serde(default)]
        pub rot: i32,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct BuildingDef {
        pub class: String,
        #[serde(default)]
        pub category: String,
        pub dims: Vector2,
        #[serde(default)]
        pub belt_in: Vec<Connector>,
        #[serde(default)]
        pub belt_out: Vec<Connector>,
        #[serde(default)]
        pub pipe_in: Vec<Connector>,
        #[serde(default)]
        pub pipe_out: Vec<Connector>,
    }

    impl BuildingDef {
        pub fn new(class: impl Into<String>, category: impl Into<String>, w: f64, h: f64) -> Self {
            Self {
                class: class.into(),
                category: category.into(),
                dims: Vector2::new(w, h),
                belt_in: Vec::new(),
                belt_out: Vec::new(),
                pipe_in: Vec::new(),
                pipe_out: Vec::new(),
            }
        }

        /// 建筑的旋转支点：半尺寸取整，保证旋转后仍落在整格上。
        #[inline]
        pub fn pivot(&self) -> Vector2 {
            self.dims.scale(0.5).round()
        }

        /// 未变换的占地矩形 `(0,0)-(w,h)`。
        #[inline]
        pub fn footprint(&self) -> Rect {
            Rect::new(0.0, 0.0, self.dims.x(), self.dims.y())
        }

        pub fn connector_count(&self) -> usize {
            self.belt_in.len() + self.belt_out.len() + self.pipe_in.len() + self.pipe_out.len()
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct PathDef {
        pub class: String,
        pub width: f64,
        #[serde(default = "PathDef::default_color")]
        pub color: String,
        #[serde(default)]
        pub is_directional: bool,
    }

    impl PathDef {
        fn default_color() -> String {
            "#808080".to_string()
        }

        pub fn new(class: impl Into<String>, width: f64, is_directional: bool) -> Self {
            Self {
                class: class.into(),
                width,
                color: Self::default_color(),
                is_directional,
            }
        }
    }

    /// 只读的对象定义表，启动时加载一次。对象通过下标引用定义。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct Catalog {
        #[serde(default)]
        buildings: Vec<BuildingDef>,
        #[serde(default)]
        paths: Vec<PathDef>,
    }

    impl Catalog {
        pub fn new(buildings: Vec<BuildingDef>, paths: Vec<PathDef>) -> Self {
            Self { buildings, paths }
        }

        /// 内置的最小定义表，在找不到外部 JSON 时使用。
        pub fn builtin() -> Self {
            let mut constructor = BuildingDef::new("Constructor", "Production", 8.0, 10.0);
            constructor.belt_in.push(Connector {
                pos: Point2::new(4.0, 10.0),
                rot: 0,
            });
            constructor.belt_out.push(Connector {
                pos: Point2::new(4.0, 0.0),
                rot: 0,
            });

            let mut assembler = BuildingDef::new("Assembler", "Production", 10.0, 15.0);
            assembler.belt_in.push(Connector {
                pos: Point2::new(3.0, 15.0),
                rot: 0,
            });
            assembler.belt_in.push(Connector {
                pos: Point2::new(7.0, 15.0),
                rot: 0,
            });
            assembler.belt_out.push(Connector {
                pos: Point2::new(5.0, 0.0),
                rot: 0,
            });

            let mut splitter = BuildingDef::new("Conveyor Splitter", "Logistics", 4.0, 4.0);
            splitter.belt_in.push(Connector {
                pos: Point2::new(2.0, 4.0),
                rot: 0,
            });
            for (x, y, rot) in [(0.0, 2.0, 270), (2.0, 0.0, 0), (4.0, 2.0, 90)] {
                splitter.belt_out.push(Connector {
                    pos: Point2::new(x, y),
                    rot,
                });
            }

            let mut refinery = BuildingDef::new("Refinery", "Production", 10.0, 20.0);
            refinery.pipe_in.push(Connector {
                pos: Point2::new(7.0, 20.0),
                rot: 0,
            });
            refinery.pipe_out.push(Connector {
                pos: Point2::new(3.0, 0.0),
                rot: 0,
            });

            let foundation = BuildingDef::new("Foundation", "Structure", 2.0, 2.0);

            let mut belt = PathDef::new("Conveyor Belt", 1.0, true);
            belt.color = "#f59e0b".to_string();
            let mut pipe = PathDef::new("Pipeline", 1.0, true);
            pipe.color = "#0ea5e9".to_string();
            let walkway = PathDef::new("Walkway", 2.0, false);

            Self::new(
                vec![constructor, assembler, splitter, refinery, foundation],
                vec![belt, pipe, walkway],
            )
        }

        #[inline]
        pub fn buildings(&self) -> &[BuildingDef] {
            &self.buildings
        }

        #[inline]
        pub fn paths(&self) -> &[PathDef] {
            &self.paths
        }

        /// 按下标取建筑定义；下标越界属于调用方错误。
        #[inline]
        pub fn building(&self, idx: usize) -> &BuildingDef {
            &self.buildings[idx]
        }

        #[inline]
        pub fn path(&self, idx: usize) -> &PathDef {
            &self.paths[idx]
        }

        pub fn building_index(&self, class: &str) -> Option<usize> {
            self.buildings.iter().position(|def| def.class == class)
        }

        pub fn path_index(&self, class: &str) -> Option<usize> {
            self.paths.iter().position(|def| def.class == class)
        }

        /// 去重并排序后的建筑分类列表。
        pub fn categories(&self) -> Vec<&str> {
            let mut categories: Vec<&str> =
                self.buildings.iter().map(|def| def.category.as_str()).collect();
            categories.sort_unstable();
            categories.dedup();
            categories
        }

        pub fn buildings_in_category<'a>(
            &'a self,
            category: &'a str,
        ) -> impl Iterator<Item = (usize, &'a BuildingDef)> + 'a {
            self.buildings
                .iter()
                .enumerate()
                .filter(move |(_, def)| def.category == category)
        }
    }

}

pub mod objects {
    use serde::{Deserialize, Serialize};

    use crate::catalog::Catalog;
    use crate::geometry::{Matrix, Point2, Rect, Vector2};

    /// 已放置的建筑。`rot` 始终为 0/90/180/270。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Building {
        pub def_idx: usize,
        pub pos: Point2,
        pub rot: i32,
    }

    impl Building {
        #[inline]
        pub fn new(def_idx: usize, pos: Point2, rot: i32) -> Self {
            Self {
                def_idx,
                pos,
                rot: rot.rem_euclid(360),
            }
        }

        /// 局部坐标（占地矩形）到世界坐标的变换。
        pub fn matrix(&self, catalog: &Catalog) -> Matrix {
            let pivot = catalog.building(self.def_idx).pivot();
            Matrix::translation(self.pos.to_vector())
                .rotate(self.rot)
                .translate(-pivot)
        }

        pub fn bounds(&self, catalog: &Catalog) -> Rect {
            let footprint = catalog.building(self.def_idx).footprint();
            self.matrix(catalog).apply_rect(&footprint)
        }
    }

    /// 线段路径（传送带、管道等）。起点与终点重合时无效。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Path {
        pub def_idx: usize,
        pub start: Point2,
        pub end: Point2,
    }

    impl Path {
        #[inline]
        pub fn new(def_idx: usize, start: Point2, end: Point2) -> Self {
            Self {
                def_idx,
                start,
                end,
            }
        }

        #[inline]
        pub fn is_valid(&self) -> bool {
            self.start != self.end
        }

        #[inline]
        pub fn reversed(self) -> Self {
            Self {
                def_idx: self.def_idx,
                start: self.end,
                end: self.start,
            }
        }

        fn half_width(&self, catalog: &Catalog) -> f64 {
            catalog.path(self.def_idx).width * 0.5
        }

        pub fn hits_start(&self, point: Point2, catalog: &Catalog) -> bool {
            let r = self.half_width(catalog);
            point.distance_squared(self.start) <= r * r
        }

        pub fn hits_end(&self, point: Point2, catalog: &Catalog) -> bool {
            let r = self.half_width(catalog);
            point.distance_squared(self.end) <= r * r
        }

        /// 在线段自身坐标系中判断：沿线方向落在 `[0, len]`，横向落在半宽内。
        pub fn hits_body(&self, point: Point2, catalog: &Catalog) -> bool {
            let axis = self.start.vector_to(self.end).0;
            let len_sq = axis.length_squared();
            if len_sq == 0.0 {
                return false;
            }
            let local = self.start.vector_to(point).0;
            let along = local.dot(axis);
            let across = axis.perp_dot(local);
            let half = self.half_width(catalog);
            along >= 0.0 && along <= len_sq && across.abs() <= half * len_sq.sqrt()
        }

        pub fn bounds(&self) -> Rect {
            Rect::from_corners(self.start, self.end)
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct TextBox {
        pub bounds: Rect,
        pub content: String,
    }

    impl TextBox {
        pub fn new(bounds: Rect, content: impl Into<String>) -> Self {
            Self {
                bounds,
                content: content.into(),
            }
        }

        /// 右下角的缩放手柄。`size` 为世界坐标下的边长。
        pub fn handle_rect(&self, size: f64) -> Rect {
            let br = self.bounds.bottom_right();
            Rect::new(br.x() - size, br.y() - size, size, size)
        }
    }

    /// 对场景中某个对象（或路径端点）的位置引用。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum ObjectRef {
        Building(usize),
        Path(usize),
        PathStart(usize),
        PathEnd(usize),
        TextBox(usize),
    }

    /// 三类对象各自独立的有序序列；对象身份就是其下标。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct ObjectCollection {
        pub buildings: Vec<Building>,
        pub paths: Vec<Path>,
        pub text_boxes: Vec<TextBox>,
    }

    impl ObjectCollection {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn from_buildings(buildings: Vec<Building>) -> Self {
            Self {
                buildings,
                ..Self::default()
            }
        }

        pub fn from_paths(paths: Vec<Path>) -> Self {
            Self {
                paths,
                ..Self::default()
            }
        }

        pub fn from_text_boxes(text_boxes: Vec<TextBox>) -> Self {
            Self {
                text_boxes,
                ..Self::default()
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.buildings.is_empty() && self.paths.is_empty() && self.text_boxes.is_empty()
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.buildings.len() + self.paths.len() + self.text_boxes.len()
        }

        /// 按选择集的遍历顺序拷贝被选中的对象。部分选中的路径整条拷贝。
        pub fn gather(&self, selection: &ObjectSelection) -> ObjectCollection {
            ObjectCollection {
                buildings: selection
                    .buildings()
                    .iter()
                    .map(|&i| self.buildings[i])
                    .collect(),
                paths: selection.paths().iter().map(|sel| self.paths[sel.idx]).collect(),
                text_boxes: selection
                    .text_boxes()
                    .iter()
                    .map(|&i| self.text_boxes[i].clone())
                    .collect(),
            }
        }

        /// 框选：完整落入矩形的建筑与文本框，以及端点落入矩形的路径（两端分别记录）。
        pub fn select_in_rect(&self, rect: &Rect, catalog: &Catalog) -> ObjectSelection {
            let mut selection = ObjectSelection::new();
            for (i, building) in self.buildings.iter().enumerate() {
                if rect.contains_rect(&building.bounds(catalog)) {
                    selection.insert_building(i);
                }
            }
            for (i, path) in self.paths.iter().enumerate() {
                let start = rect.contains_point(path.start);
                let end = rect.contains_point(path.end);
                if start || end {
                    selection.insert_path(PathSel { idx: i, start, end });
                }
            }
            for (i, text_box) in self.text_boxes.iter().enumerate() {
                if rect.contains_rect(&text_box.bounds) {
                    selection.insert_text_box(i);
                }
            }
            selection.recompute_bounds(self, catalog);
            selection
        }
    }

    /// 选中的路径及其端点。至少一个端点为真；两端都选中即整条路径。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PathSel {
        pub idx: usize,
        pub start: bool,
        pub end: bool,
    }

    impl PathSel {
        #[inline]
        pub fn full(idx: usize) -> Self {
            Self {
                idx,
                start: true,
                end: true,
            }
        }

        #[inline]
        pub fn is_full(&self) -> bool {
            self.start && self.end
        }
    }

    /// 指向 `ObjectCollection` 的升序下标集合，附带缓存的包围盒。
    /// 下标只在场景结构未改变期间有效。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct ObjectSelection {
        buildings: Vec<usize>,
        paths: Vec<PathSel>,
        text_boxes: Vec<usize>,
        bounds: Rect,
    }

    impl ObjectSelection {
        pub fn new() -> Self {
            Self::default()
        }

        /// 选中单个对象。点中路径端点时只选该端点。
        pub fn from_object(
            object: ObjectRef,
            collection: &ObjectCollection,
            catalog: &Catalog,
        ) -> Self {
            let mut selection = Self::new();
            match object {
                ObjectRef::Building(i) => selection.insert_building(i),
                ObjectRef::Path(i) => selection.insert_path(PathSel::full(i)),
                ObjectRef::PathStart(i) => selection.insert_path(PathSel {
                    idx: i,
                    start: true,
                    end: false,
                }),
                ObjectRef::PathEnd(i) => selection.insert_path(PathSel {
                    idx: i,
                    start: false,
                    end: true,
                }),
                ObjectRef::TextBox(i) => selection.insert_text_box(i),
            }
            selection.recompute_bounds(collection, catalog);
            selection
        }

        /// 选中 `[start, end)` 范围内的全部对象，用于追加操作之后的选择。
        pub fn from_ranges(
            buildings: std::ops::Range<usize>,
            paths: std::ops::Range<usize>,
            text_boxes: std::ops::Range<usize>,
        ) -> Self {
            Self {
                buildings: buildings.collect(),
                paths: paths.map(PathSel::full).collect(),
                text_boxes: text_boxes.collect(),
                bounds: Rect::empty(),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.buildings.is_empty() && self.paths.is_empty() && self.text_boxes.is_empty()
        }

        #[inline]
        pub fn buildings(&self) -> &[usize] {
            &self.buildings
        }

        #[inline]
        pub fn paths(&self) -> &[PathSel] {
            &self.paths
        }

        #[inline]
        pub fn text_boxes(&self) -> &[usize] {
            &self.text_boxes
        }

        #[inline]
        pub fn bounds(&self) -> Rect {
            self.bounds
        }

        pub fn insert_building(&mut self, idx: usize) {
            if let Err(pos) = self.buildings.binary_search(&idx) {
                self.buildings.insert(pos, idx);
            }
        }

        /// 插入路径选择；同一路径已存在时合并端点标记。
        pub fn insert_path(&mut self, sel: PathSel) {
            assert!(sel.start || sel.end, "path selection must include an endpoint");
            match self.paths.binary_search_by_key(&sel.idx, |p| p.idx) {
                Ok(pos) => {
                    let existing = &mut self.paths[pos];
                    existing.start |= sel.start;
                    existing.end |= sel.end;
                }
                Err(pos) => self.paths.insert(pos, sel),
            }
        }

        pub fn insert_text_box(&mut self, idx: usize) {
            if let Err(pos) = self.text_boxes.binary_search(&idx) {
                self.text_boxes.insert(pos, idx);
            }
        }

        #[inline]
        pub fn contains_building(&self, idx: usize) -> bool {
            self.buildings.binary_search(&idx).is_ok()
        }

        pub fn path(&self, idx: usize) -> Option<PathSel> {
            self.paths
                .binary_search_by_key(&idx, |p| p.idx)
                .ok()
                .map(|pos| self.paths[pos])
        }

        #[inline]
        pub fn contains_text_box(&self, idx: usize) -> bool {
            self.text_boxes.binary_search(&idx).is_ok()
        }

        /// 判断对象引用是否在选择集中；端点引用要求对应端点被选中。
        pub fn contains(&self, object: ObjectRef) -> bool {
            match object {
                ObjectRef::Building(i) => self.contains_building(i),
                ObjectRef::Path(i) => self.path(i).is_some(),
                ObjectRef::PathStart(i) => self.path(i).is_some_and(|p| p.start),
                ObjectRef::PathEnd(i) => self.path(i).is_some_and(|p| p.end),
                ObjectRef::TextBox(i) => self.contains_text_box(i),
            }
        }

        pub fn full_path_idxs(&self) -> impl Iterator<Item = usize> + '_ {
            self.paths.iter().filter(|p| p.is_full()).map(|p| p.idx)
        }

        /// 仅由路径端点组成的选择（无建筑、无文本框、无整条路径）。
        pub fn is_endpoints_only(&self) -> bool {
            self.buildings.is_empty()
                && self.text_boxes.is_empty()
                && !self.paths.is_empty()
                && self.paths.iter().all(|p| !p.is_full())
        }

        pub fn len(&self) -> usize {
            self.buildings.len() + self.paths.len() + self.text_boxes.len()
        }

        pub fn recompute_bounds(&mut self, collection: &ObjectCollection, catalog: &Catalog) {
            let mut bounds = Rect::empty();
            for &i in &self.buildings {
                bounds.include_rect(&collection.buildings[i].bounds(catalog));
            }
            for sel in &self.paths {
                let path = &collection.paths[sel.idx];
                if sel.start {
                    bounds.include_point(path.start);
                }
                if sel.end {
                    bounds.include_point(path.end);
                }
            }
            for &i in &self.text_boxes {
                bounds.include_rect(&collection.text_boxes[i].bounds);
            }
            self.bounds = bounds;
        }

        /// 下标是否全部对 `collection` 有效。
        pub fn is_valid_for(&self, collection: &ObjectCollection) -> bool {
            self.buildings.iter().all(|&i| i < collection.buildings.len())
                && self.paths.iter().all(|p| p.idx < collection.paths.len())
                && self.text_boxes.iter().all(|&i| i < collection.text_boxes.len())
        }
    }

    /// 单位平移向量，供方向键微移使用。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Direction {
        Up,
        Down,
        Left,
        Right,
    }

    impl Direction {
        pub fn offset(self, step: f64) -> Vector2 {
            match self {
                Direction::Up => Vector2::new(0.0, -step),
                Direction::Down => Vector2::new(0.0, step),
                Direction::Left => Vector2::new(-step, 0.0),
                Direction::Right => Vector2::new(step, 0.0),
            }
        }
    }

}
