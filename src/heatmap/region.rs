//! 计数区域 (Counting region)
//! 简单多边形: 点包含测试与质心, 用于方向计数

use anyhow::{bail, Result};

/// 计数区域多边形
///
/// 配置时构造一次, 之后不可变. 构造时拒绝退化输入:
/// 少于3个顶点、零面积、自相交
#[derive(Clone, Debug)]
pub struct CountingRegion {
    points: Vec<(f32, f32)>,
    centroid: (f32, f32),
}

impl CountingRegion {
    pub fn new(points: Vec<(f32, f32)>) -> Result<Self> {
        if points.len() < 3 {
            bail!(
                "counting region needs at least 3 points, got {}",
                points.len()
            );
        }

        // 两倍带符号面积, 零面积即顶点共线
        let area2 = signed_area2(&points);
        if area2.abs() < f32::EPSILON {
            bail!("counting region polygon is degenerate (zero area)");
        }

        if self_intersects(&points) {
            bail!("counting region polygon is self-intersecting");
        }

        let centroid = polygon_centroid(&points, area2);
        Ok(Self { points, centroid })
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    /// 多边形质心 (面积加权)
    pub fn centroid(&self) -> (f32, f32) {
        self.centroid
    }

    /// 点包含测试 (射线法)
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let pts = &self.points;
        let n = pts.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = pts[i];
            let (xj, yj) = pts[j];
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

fn signed_area2(pts: &[(f32, f32)]) -> f32 {
    let n = pts.len();
    let mut sum = 0.0;
    for i in 0..n {
        let (x0, y0) = pts[i];
        let (x1, y1) = pts[(i + 1) % n];
        sum += x0 * y1 - x1 * y0;
    }
    sum
}

fn polygon_centroid(pts: &[(f32, f32)], area2: f32) -> (f32, f32) {
    let n = pts.len();
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let (x0, y0) = pts[i];
        let (x1, y1) = pts[(i + 1) % n];
        let cross = x0 * y1 - x1 * y0;
        cx += (x0 + x1) * cross;
        cy += (y0 + y1) * cross;
    }
    (cx / (3.0 * area2), cy / (3.0 * area2))
}

/// 非相邻边两两求交 (O(n²), 区域顶点数很小)
fn self_intersects(pts: &[(f32, f32)]) -> bool {
    let n = pts.len();
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        for j in (i + 2)..n {
            // 首尾边相邻, 跳过
            if i == 0 && j == n - 1 {
                continue;
            }
            let c = pts[j];
            let d = pts[(j + 1) % n];
            if segments_cross(a, b, c, d) {
                return true;
            }
        }
    }
    false
}

fn segments_cross(a: (f32, f32), b: (f32, f32), c: (f32, f32), d: (f32, f32)) -> bool {
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

fn cross(o: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}
