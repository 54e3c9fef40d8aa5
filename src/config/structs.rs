use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Result, anyhow};

/// One `SRC[:DST][:ro]` volume specification: a host path to share with the
/// sandbox principal, an optional destination to surface it at inside the
/// sandbox root, and whether the grant is read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareSpec {
    pub source: PathBuf,
    pub dest: Option<PathBuf>,
    pub read_only: bool,
}

impl FromStr for ShareSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [source] if !source.is_empty() => Ok(ShareSpec {
                source: PathBuf::from(source),
                dest: None,
                read_only: false,
            }),
            [source, "ro"] if !source.is_empty() => Ok(ShareSpec {
                source: PathBuf::from(source),
                dest: None,
                read_only: true,
            }),
            [source, dest] if !source.is_empty() && !dest.is_empty() => {
                Ok(ShareSpec {
                    source: PathBuf::from(source),
                    dest: Some(PathBuf::from(dest)),
                    read_only: false,
                })
            }
            [source, dest, "ro"]
                if !source.is_empty() && !dest.is_empty() =>
            {
                Ok(ShareSpec {
                    source: PathBuf::from(source),
                    dest: Some(PathBuf::from(dest)),
                    read_only: true,
                })
            }
            _ => Err(anyhow!(
                "Invalid volume '{}', expected SRC[:DST][:ro]",
                s
            )),
        }
    }
}

impl std::fmt::Display for ShareSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source.display())?;
        if let Some(dest) = &self.dest {
            write!(f, ":{}", dest.display())?;
        }
        if self.read_only {
            write!(f, ":ro")?;
        }
        Ok(())
    }
}

/// A KEY=VALUE environment override for the sandboxed command. A bare KEY
/// sets the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

impl FromStr for EnvVar {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (key, value) = s.split_once('=').unwrap_or((s, ""));
        if key.is_empty() {
            return Err(anyhow!(
                "Invalid environment variable '{}', expected KEY=VALUE",
                s
            ));
        }
        Ok(EnvVar {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_spec_source_only() -> Result<()> {
        let spec: ShareSpec = "/data".parse()?;
        assert_eq!(spec.source, PathBuf::from("/data"));
        assert_eq!(spec.dest, None);
        assert!(!spec.read_only);
        Ok(())
    }

    #[test]
    fn test_share_spec_read_only_without_dest() -> Result<()> {
        let spec: ShareSpec = "/data:ro".parse()?;
        assert_eq!(spec.source, PathBuf::from("/data"));
        assert_eq!(spec.dest, None);
        assert!(spec.read_only);
        Ok(())
    }

    #[test]
    fn test_share_spec_with_dest() -> Result<()> {
        let spec: ShareSpec = "/data:/mnt/data".parse()?;
        assert_eq!(spec.dest, Some(PathBuf::from("/mnt/data")));
        assert!(!spec.read_only);

        let spec: ShareSpec = "/data:/mnt/data:ro".parse()?;
        assert_eq!(spec.dest, Some(PathBuf::from("/mnt/data")));
        assert!(spec.read_only);
        Ok(())
    }

    #[test]
    fn test_share_spec_rejects_garbage() {
        assert!("".parse::<ShareSpec>().is_err());
        assert!(":/dest".parse::<ShareSpec>().is_err());
        assert!("/a:/b:rw:extra".parse::<ShareSpec>().is_err());
        assert!("/a:/b:nonsense".parse::<ShareSpec>().is_err());
    }

    #[test]
    fn test_share_spec_round_trips_through_display() -> Result<()> {
        for raw in ["/data", "/data:ro", "/data:/mnt/data:ro"] {
            let spec: ShareSpec = raw.parse()?;
            assert_eq!(spec.to_string(), raw);
        }
        Ok(())
    }

    #[test]
    fn test_env_var_parse() -> Result<()> {
        let var: EnvVar = "FOO=bar".parse()?;
        assert_eq!((var.key.as_str(), var.value.as_str()), ("FOO", "bar"));

        // Values may themselves contain '='
        let var: EnvVar = "FOO=a=b".parse()?;
        assert_eq!(var.value, "a=b");

        // A bare key sets the empty string
        let var: EnvVar = "FOO".parse()?;
        assert_eq!(var.value, "");

        assert!("=value".parse::<EnvVar>().is_err());
        Ok(())
    }
}
