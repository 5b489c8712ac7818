//! Launch parameter parsing for the viewer.
//!
//! On native, parameters are parsed from command-line arguments using clap.
//! On WASM, defaults are used.

use bevy::prelude::*;

/// Default target longitude (NYC).
const DEFAULT_LON: f64 = -74.0;
/// Default target latitude (NYC).
const DEFAULT_LAT: f64 = 40.7;
/// Default heading in degrees; 90 faces north.
const DEFAULT_HEADING: f64 = 90.0;
/// Default pitch in degrees below the horizon.
const DEFAULT_PITCH: f64 = 60.0;
/// Default distance from the target in meters.
const DEFAULT_DISTANCE: f64 = 12_000_000.0;

/// Launch parameters for the viewer.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct LaunchParams {
    /// Target longitude in degrees.
    pub lon: f64,
    /// Target latitude in degrees.
    pub lat: f64,
    /// Camera heading in degrees.
    pub heading: f64,
    /// Camera pitch in degrees.
    pub pitch: f64,
    /// Distance from camera to target in meters.
    pub distance: f64,
    /// Smooth rotation and panning with damping.
    pub damping: bool,
    /// Zoom toward the point under the cursor.
    pub zoom_to_cursor: bool,
    /// Orbit the target while idle.
    pub auto_rotate: bool,
    /// Use an orthographic instead of a perspective projection.
    pub orthographic: bool,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            lon: DEFAULT_LON,
            lat: DEFAULT_LAT,
            heading: DEFAULT_HEADING,
            pitch: DEFAULT_PITCH,
            distance: DEFAULT_DISTANCE,
            damping: true,
            zoom_to_cursor: true,
            auto_rotate: false,
            orthographic: false,
        }
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    #[command(about = "Globe viewer with geodetic orbit camera controls")]
    struct CliArgs {
        /// Target longitude in degrees.
        #[arg(long, default_value_t = DEFAULT_LON, allow_negative_numbers = true)]
        lon: f64,

        /// Target latitude in degrees.
        #[arg(long, default_value_t = DEFAULT_LAT, allow_negative_numbers = true)]
        lat: f64,

        /// Camera heading in degrees (0 faces east, 90 faces north).
        #[arg(long, default_value_t = DEFAULT_HEADING, allow_negative_numbers = true)]
        heading: f64,

        /// Camera pitch in degrees; positive looks down on the target.
        #[arg(long, default_value_t = DEFAULT_PITCH, allow_negative_numbers = true)]
        pitch: f64,

        /// Distance from the camera to the target in meters.
        #[arg(long, default_value_t = DEFAULT_DISTANCE)]
        distance: f64,

        /// Disable damping of camera motion.
        #[arg(long)]
        no_damping: bool,

        /// Zoom toward the target instead of the cursor.
        #[arg(long)]
        no_zoom_to_cursor: bool,

        /// Slowly rotate around the target while idle.
        #[arg(long)]
        auto_rotate: bool,

        /// Use an orthographic projection.
        #[arg(long)]
        orthographic: bool,
    }

    /// Parse launch parameters from the command line.
    pub fn parse() -> LaunchParams {
        let args = CliArgs::parse();
        LaunchParams {
            lon: args.lon,
            lat: args.lat,
            heading: args.heading,
            pitch: args.pitch,
            distance: args.distance,
            damping: !args.no_damping,
            zoom_to_cursor: !args.no_zoom_to_cursor,
            auto_rotate: args.auto_rotate,
            orthographic: args.orthographic,
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_cli_args_negative_coordinates() {
            let args =
                CliArgs::try_parse_from(["geomap-viewer", "--lon", "-122.4", "--lat", "-33.9"])
                    .unwrap();
            assert_eq!(args.lon, -122.4);
            assert_eq!(args.lat, -33.9);
            assert!(!args.no_damping);
        }

        #[test]
        fn test_cli_args_flags() {
            let args = CliArgs::try_parse_from([
                "geomap-viewer",
                "--no-damping",
                "--auto-rotate",
                "--orthographic",
                "--distance",
                "5000",
            ])
            .unwrap();
            assert!(args.no_damping);
            assert!(args.auto_rotate);
            assert!(args.orthographic);
            assert_eq!(args.distance, 5000.0);
        }
    }
}

/// Parse launch parameters from CLI args (native) or use defaults (WASM).
pub fn parse() -> LaunchParams {
    #[cfg(not(target_family = "wasm"))]
    {
        native::parse()
    }
    #[cfg(target_family = "wasm")]
    {
        LaunchParams::default()
    }
}
