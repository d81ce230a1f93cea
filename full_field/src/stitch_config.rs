use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use mroi_data::averaging::AveragingPolicy;
use mroi_data::quality::BlockSnr;
use serde::{Deserialize, Serialize};
use toml;
use crate::error::ConfigError;

pub trait Config {
    fn default() -> Self;
}

pub trait ConfigFile: Sized {
    fn to_file(&self, filename:&Path) -> Result<(),ConfigError>;
    fn from_file(filename:&Path) -> Result<Self,ConfigError>;
    fn file_ext() -> String;
}

/// How surface tiles are scaled before they are resampled onto the canvas.
#[derive(Clone,Copy,Debug,PartialEq,Serialize,Deserialize)]
pub struct SurfaceIntensity {
    /// after subtracting the minimum, stretch each tile to [0, rescale_max]
    pub rescale_max:Option<f64>,
}

impl Config for SurfaceIntensity {
    fn default() -> Self {
        Self {
            rescale_max:None,
        }
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct StitchSettings {
    pub correct_line_phase:bool,
    pub averaging:AveragingPolicy,
    pub surface:SurfaceIntensity,
    pub quality_block:Option<BlockSnr>,
}

impl Config for StitchSettings {
    fn default() -> Self {
        Self {
            correct_line_phase:false,
            averaging:AveragingPolicy::default(),
            surface:SurfaceIntensity::default(),
            quality_block:None,
        }
    }
}

impl ConfigFile for StitchSettings {

    fn to_file(&self, filename:&Path) -> Result<(),ConfigError> {
        let t = toml::to_string_pretty(&self)?;
        let mut f = File::create(with_ext(filename,&Self::file_ext()))?;
        f.write_all(t.as_bytes())?;
        Ok(())
    }

    fn from_file(filename:&Path) -> Result<Self,ConfigError> {
        let mut f = File::open(with_ext(filename,&Self::file_ext()))?;
        let mut t = String::new();
        f.read_to_string(&mut t)?;
        Ok(toml::from_str(&t)?)
    }

    fn file_ext() -> String {
        String::from("stitch_settings")
    }

}

fn with_ext(filename:&Path,ext:&str) -> PathBuf {
    filename.with_extension(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mroi_data::quality::SnrMetric;

    #[test]
    fn settings_file_round_trip(){
        let dir = std::env::temp_dir().join(format!("stitch_settings_test_{}",std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("run");
        let mut s = <StitchSettings as Config>::default();
        s.correct_line_phase = true;
        s.surface.rescale_max = Some(65535.0);
        s.averaging = AveragingPolicy::none();
        s.quality_block = Some(BlockSnr {block_shape:(32,32),window:(6,10),metric:SnrMetric::Acutance});
        s.to_file(&path).unwrap();
        assert!(dir.join("run.stitch_settings").exists());
        let back = StitchSettings::from_file(&path).unwrap();
        assert_eq!(back,s);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file(){
        let r = StitchSettings::from_file(Path::new("/definitely/not/here"));
        assert!(matches!(r,Err(ConfigError::Io(_))));
    }

    #[test]
    fn bad_toml(){
        let r:Result<StitchSettings,toml::de::Error> = toml::from_str("correct_line_phase = 3");
        let e:ConfigError = r.unwrap_err().into();
        assert!(e.to_string().contains("cannot parse settings"));
    }
}
