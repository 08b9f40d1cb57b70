//! 伪彩色映射 (False-color palettes)
//! 将归一化后的密度值 [0,255] 映射为RGB

use anyhow::{bail, Result};
use image::Rgb;

/// 伪彩色调色板
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Colormap {
    /// 经典Jet (蓝→青→黄→红)
    Jet,
    /// Turbo (Jet的感知均匀改进版)
    Turbo,
    /// 黑→红→黄→白
    Hot,
    /// 青→品红
    Cool,
}

impl Default for Colormap {
    fn default() -> Self {
        Colormap::Jet
    }
}

impl Colormap {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jet" => Ok(Colormap::Jet),
            "turbo" => Ok(Colormap::Turbo),
            "hot" => Ok(Colormap::Hot),
            "cool" => Ok(Colormap::Cool),
            other => bail!("unknown colormap '{other}' (expected jet/turbo/hot/cool)"),
        }
    }

    /// 映射单个归一化值
    pub fn map(&self, value: u8) -> Rgb<u8> {
        let t = value as f32 / 255.0;
        let (r, g, b) = match self {
            Colormap::Jet => jet(t),
            Colormap::Turbo => turbo(t),
            Colormap::Hot => hot(t),
            Colormap::Cool => (t, 1.0 - t, 1.0),
        };
        Rgb([to_u8(r), to_u8(g), to_u8(b)])
    }
}

fn to_u8(x: f32) -> u8 {
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn jet(t: f32) -> (f32, f32, f32) {
    let r = 1.5 - (4.0 * t - 3.0).abs();
    let g = 1.5 - (4.0 * t - 2.0).abs();
    let b = 1.5 - (4.0 * t - 1.0).abs();
    (r, g, b)
}

/// Turbo多项式近似
fn turbo(t: f32) -> (f32, f32, f32) {
    let r = 0.13572138
        + t * (4.61539260
            + t * (-42.66032258 + t * (132.13108234 + t * (-152.94239396 + t * 59.28637943))));
    let g = 0.09140261
        + t * (2.19418839
            + t * (4.84296658 + t * (-14.18503333 + t * (4.27729857 + t * 2.82956604))));
    let b = 0.10667330
        + t * (12.64194608
            + t * (-60.58204836 + t * (110.36276771 + t * (-89.90310912 + t * 27.34824973))));
    (r, g, b)
}

fn hot(t: f32) -> (f32, f32, f32) {
    (3.0 * t, 3.0 * t - 1.0, 3.0 * t - 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Colormap::from_name("jet").unwrap(), Colormap::Jet);
        assert_eq!(Colormap::from_name("TURBO").unwrap(), Colormap::Turbo);
        assert!(Colormap::from_name("plasma").is_err());
    }

    #[test]
    fn test_jet_endpoints() {
        // 低端深蓝, 高端深红
        assert_eq!(Colormap::Jet.map(0), Rgb([0, 0, 128]));
        assert_eq!(Colormap::Jet.map(255), Rgb([128, 0, 0]));
        // 中段偏绿
        let mid = Colormap::Jet.map(128);
        assert_eq!(mid[1], 255);
    }

    #[test]
    fn test_hot_endpoints() {
        assert_eq!(Colormap::Hot.map(0), Rgb([0, 0, 0]));
        assert_eq!(Colormap::Hot.map(255), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_cool_endpoints() {
        assert_eq!(Colormap::Cool.map(0), Rgb([0, 255, 255]));
        assert_eq!(Colormap::Cool.map(255), Rgb([255, 0, 255]));
    }

    #[test]
    fn test_turbo_runs_blue_to_red() {
        let lo = Colormap::Turbo.map(0);
        let hi = Colormap::Turbo.map(255);
        assert!(lo[2] > lo[0], "low end should be blue-dominant: {lo:?}");
        assert!(hi[0] > hi[2], "high end should be red-dominant: {hi:?}");
    }
}
