// THEORY:
// The `pixel` module is the color model converter of the engine. It knows how to
// move a single 8-bit RGB pixel into the two derived color models the equalizer
// works in, and back again:
//
// - HSV, where the "value" channel (max of R, G, B) is the equalized scalar.
// - YUV, where the "luma" channel is the equalized scalar.
//
// Everything here is a pure function over `Copy` values: no allocation, no
// shared state, no failure modes. Out-of-range inputs saturate instead of
// panicking, so the hot per-pixel loop never has to branch on errors.
//
// The YUV transform exists in several coefficient sets. The default is the
// integer fixed-point BT.601 "studio swing" transform; the floating point EBU,
// BT.601 and BT.709 sets are selectable through `YuvStandard` at construction
// time of the equalizer.

pub mod pixel {
    use serde::{Deserialize, Serialize};

    pub type Channel = u8;
    pub type Hue = f64;
    pub type Saturation = f64;
    pub type Value = f64;
    pub type YuvComponent = i32;

    const CHANNEL_MAX: f64 = 255.0;
    // Tie-break tolerance for comparisons against the channel max.
    const EPSILON: f64 = f32::EPSILON as f64;

    /// A packed 8-bit RGB pixel as stored in the frame buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Rgb {
        pub red: Channel,
        pub green: Channel,
        pub blue: Channel,
    }

    impl Rgb {
        pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Self { red, green, blue }
        }

        /// Reads the first three bytes of `bytes` as R, G, B.
        #[inline]
        pub fn from_bytes(bytes: &[u8]) -> Self {
            Self::new(bytes[0], bytes[1], bytes[2])
        }

        /// Writes R, G, B into the first three bytes of `bytes`.
        #[inline]
        pub fn write_to(self, bytes: &mut [u8]) {
            bytes[0] = self.red;
            bytes[1] = self.green;
            bytes[2] = self.blue;
        }
    }

    impl From<[u8; 3]> for Rgb {
        fn from(bytes: [u8; 3]) -> Self {
            Self::new(bytes[0], bytes[1], bytes[2])
        }
    }

    /// HSV triple, every component normalized to [0, 1].
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Hsv {
        /// Hue as a fraction of the full turn, in [0, 1).
        pub hue: Hue,
        pub saturation: Saturation,
        pub value: Value,
    }

    /// YUV triple. Chroma is offset by 128 for the studio transform and
    /// bipolar (signed around zero) for the floating point standards.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Yuv {
        pub y: YuvComponent,
        pub u: YuvComponent,
        pub v: YuvComponent,
    }

    /// Coefficient set used for RGB <-> YUV conversion.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum YuvStandard {
        /// Integer fixed-point BT.601 with studio swing (Y in 16..=235).
        #[default]
        Studio,
        /// European Y'U'V' used by PAL and SECAM.
        Ebu,
        /// ITU-R BT.601 Y'CbCr, full range.
        Bt601,
        /// ITU-R BT.709 Y'CbCr, full range.
        Bt709,
    }

    #[inline]
    fn is_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[inline]
    fn to_channel(normalized: f64) -> Channel {
        (normalized * CHANNEL_MAX).round().clamp(0.0, CHANNEL_MAX) as Channel
    }

    #[inline]
    fn saturate(level: f64) -> Channel {
        level.clamp(0.0, CHANNEL_MAX) as Channel
    }

    #[inline]
    fn saturate_int(level: i32) -> Channel {
        level.clamp(0, 255) as Channel
    }

    /// Converts RGB (0..=255) into HSV (0..=1).
    pub fn rgb_to_hsv(rgb: Rgb) -> Hsv {
        let rgb_min = rgb.red.min(rgb.green.min(rgb.blue));
        let rgb_max = rgb.red.max(rgb.green.max(rgb.blue));
        let rgb_delta = rgb_max - rgb_min;

        let value = rgb_max as f64 / CHANNEL_MAX;

        if rgb_delta == 0 {
            // Achromatic.
            return Hsv { hue: 0.0, saturation: 0.0, value };
        }

        let pr = rgb.red as f64 / CHANNEL_MAX;
        let pg = rgb.green as f64 / CHANNEL_MAX;
        let pb = rgb.blue as f64 / CHANNEL_MAX;
        let pmax = value;
        let dmax = rgb_delta as f64 / CHANNEL_MAX;

        let saturation = dmax / pmax;
        let dr = (((pmax - pr) / 6.0) + (dmax / 2.0)) / dmax;
        let dg = (((pmax - pg) / 6.0) + (dmax / 2.0)) / dmax;
        let db = (((pmax - pb) / 6.0) + (dmax / 2.0)) / dmax;

        let mut hue = if is_equal(pr, pmax) {
            db - dg
        } else if is_equal(pg, pmax) {
            (1.0 / 3.0) + dr - db
        } else {
            (2.0 / 3.0) + dg - dr
        };

        if hue < 0.0 {
            hue += 1.0;
        }
        if hue >= 1.0 {
            hue -= 1.0;
        }

        Hsv { hue, saturation, value }
    }

    /// Converts HSV (0..=1) back into RGB (0..=255).
    pub fn hsv_to_rgb(hsv: Hsv) -> Rgb {
        let value = hsv.value.clamp(0.0, 1.0);
        let saturation = hsv.saturation.clamp(0.0, 1.0);

        if is_equal(saturation, 0.0) {
            let grey = to_channel(value);
            return Rgb::new(grey, grey, grey);
        }

        let scaled_hue = if (0.0..1.0).contains(&hsv.hue) { hsv.hue * 6.0 } else { 0.0 };
        let sector = scaled_hue.floor();
        let fraction = scaled_hue - sector;

        let p1 = value * (1.0 - saturation);
        let p2 = value * (1.0 - saturation * fraction);
        let p3 = value * (1.0 - saturation * (1.0 - fraction));

        let (pr, pg, pb) = match sector as u8 {
            0 => (value, p3, p1),
            1 => (p2, value, p1),
            2 => (p1, value, p3),
            3 => (p1, p2, value),
            4 => (p3, p1, value),
            _ => (value, p1, p2),
        };

        Rgb::new(to_channel(pr), to_channel(pg), to_channel(pb))
    }

    /// Converts RGB into YUV using the given coefficient set.
    pub fn rgb_to_yuv(rgb: Rgb, standard: YuvStandard) -> Yuv {
        let (r, g, b) = (rgb.red as i32, rgb.green as i32, rgb.blue as i32);
        match standard {
            YuvStandard::Studio => Yuv {
                y: ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16,
                u: ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128,
                v: ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128,
            },
            YuvStandard::Ebu => linear_yuv(rgb, [0.299, 0.587, 0.114], [-0.147, -0.289, 0.436], [0.615, -0.515, -0.100]),
            YuvStandard::Bt601 => linear_yuv(rgb, [0.299, 0.587, 0.114], [-0.169, -0.331, 0.500], [0.500, -0.419, -0.081]),
            YuvStandard::Bt709 => linear_yuv(rgb, [0.2215, 0.7154, 0.0721], [-0.1145, -0.3855, 0.5000], [0.5016, -0.4556, -0.0459]),
        }
    }

    /// Converts YUV back into RGB using the given coefficient set.
    pub fn yuv_to_rgb(yuv: Yuv, standard: YuvStandard) -> Rgb {
        match standard {
            YuvStandard::Studio => {
                let c = yuv.y - 16;
                let d = yuv.u - 128;
                let e = yuv.v - 128;
                Rgb::new(
                    saturate_int((298 * c + 409 * e + 128) >> 8),
                    saturate_int((298 * c - 100 * d - 208 * e + 128) >> 8),
                    saturate_int((298 * c + 516 * d + 128) >> 8),
                )
            }
            YuvStandard::Ebu => linear_rgb(yuv, 1.140, (0.396, 0.581), 2.029),
            YuvStandard::Bt601 => linear_rgb(yuv, 1.403, (0.344, 0.714), 1.773),
            YuvStandard::Bt709 => linear_rgb(yuv, 1.5701, (0.1870, 0.4664), 1.8556),
        }
    }

    fn linear_yuv(rgb: Rgb, y: [f64; 3], u: [f64; 3], v: [f64; 3]) -> Yuv {
        let (r, g, b) = (rgb.red as f64, rgb.green as f64, rgb.blue as f64);
        let dot = |k: [f64; 3]| (k[0] * r + k[1] * g + k[2] * b) as YuvComponent;
        Yuv { y: dot(y), u: dot(u), v: dot(v) }
    }

    fn linear_rgb(yuv: Yuv, r_from_v: f64, g_from_uv: (f64, f64), b_from_u: f64) -> Rgb {
        let (y, u, v) = (yuv.y as f64, yuv.u as f64, yuv.v as f64);
        Rgb::new(
            saturate(y + r_from_v * v),
            saturate(y - g_from_uv.0 * u - g_from_uv.1 * v),
            saturate(y + b_from_u * u),
        )
    }

}
