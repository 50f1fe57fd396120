//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Lake scene with planar water reflection and refraction.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "lakeview",
    about = "Real-time lake scene with planar water reflection and refraction",
    long_about = "Renders terrain, a sky cube and a reflective, refractive water plane.\n\n\
        CONTROLS:\n  \
          arrows   look around\n  \
          W/A/S/D  move\n  \
          R        reset the camera\n  \
          F1-F3    show the scene depth, reflection or scene color target\n  \
          F12      save a screenshot\n  \
          Esc      quit\n\n\
        Missing assets fall back to procedurally generated ones.",
    version
)]
pub struct Args {
    /// Scene configuration (JSON). Unset fields keep their defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Terrain model (Wavefront OBJ).
    #[arg(long)]
    pub terrain: Option<PathBuf>,

    /// Directory holding the sky faces px, nx, py, ny, pz, nz (png or jpg).
    #[arg(long)]
    pub sky: Option<PathBuf>,

    /// Water offset (DUDV) map.
    #[arg(long)]
    pub water_dudv: Option<PathBuf>,

    /// Water normal map.
    #[arg(long)]
    pub water_normal: Option<PathBuf>,

    /// Window or image width in pixels.
    #[arg(long, default_value = "1280")]
    pub width: u32,

    /// Window or image height in pixels.
    #[arg(long, default_value = "720")]
    pub height: u32,

    /// Render one frame headless to this image (png or jpg) and exit.
    #[arg(long)]
    pub screenshot: Option<PathBuf>,

    /// Scene time in seconds for the headless frame.
    #[arg(long, default_value = "0")]
    pub time: f32,

    /// Exit after rendering N frames.
    #[arg(long)]
    pub max_frames: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["lakeview"]);
        assert_eq!((args.width, args.height), (1280, 720));
        assert!(args.screenshot.is_none());
        assert!(args.terrain.is_none());
    }

    #[test]
    fn test_asset_paths() {
        let args = Args::parse_from([
            "lakeview",
            "--terrain",
            "terrain.obj",
            "--sky",
            "sky",
            "--water-dudv",
            "dudv.png",
            "--screenshot",
            "out.png",
            "--width",
            "640",
        ]);
        assert_eq!(args.terrain, Some(PathBuf::from("terrain.obj")));
        assert_eq!(args.water_dudv, Some(PathBuf::from("dudv.png")));
        assert_eq!(args.screenshot, Some(PathBuf::from("out.png")));
        assert_eq!(args.width, 640);
    }

    #[test]
    fn test_command_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
