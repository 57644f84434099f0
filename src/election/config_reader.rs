use crate::election::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConfigCandidate {
    // Numbers and strings are both accepted.
    id: JSValue,
    pub name: String,
}

impl ConfigCandidate {
    pub fn id(&self) -> ElectorResult<String> {
        read_js_id(&self.id)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct ElectionConfig {
    #[serde(rename = "contestName")]
    pub contest_name: Option<String>,
    #[serde(rename = "statePath")]
    pub state_path: Option<String>,
    #[serde(default)]
    pub candidates: Vec<ConfigCandidate>,
}

impl ElectionConfig {
    /// The (id, name) pairs of the candidates to register on an empty ledger.
    pub fn seed_candidates(&self) -> ElectorResult<Vec<(String, String)>> {
        let mut res: Vec<(String, String)> = Vec::new();
        for c in self.candidates.iter() {
            res.push((c.id()?, c.name.clone()));
        }
        Ok(res)
    }
}

pub fn read_config(path: &Path) -> ElectorResult<ElectionConfig> {
    let path_s = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningConfigSnafu {
        path: path_s.clone(),
    })?;
    debug!("read_config: {:?}", contents);
    let config: ElectionConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path: path_s })?;
    Ok(config)
}

/// The settings for one run, after combining the command line and the
/// configuration file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub state_path: PathBuf,
    pub contest_name: Option<String>,
    pub seed_candidates: Vec<(String, String)>,
    pub reference_path: Option<PathBuf>,
}

pub const DEFAULT_STATE_PATH: &str = "election.json";

impl Settings {
    /// Command line flags take precedence over the configuration file. A state
    /// path from the configuration file is relative to that file.
    pub fn resolve(args: &Args) -> ElectorResult<Settings> {
        let (config, config_dir) = match args.config.as_ref() {
            Some(p) => {
                let config_p = Path::new(p.as_str());
                let config = read_config(config_p)?;
                info!("config: {:?}", config);
                let dir = config_p
                    .parent()
                    .map(|d| d.to_path_buf())
                    .unwrap_or_default();
                (config, dir)
            }
            None => (ElectionConfig::default(), PathBuf::new()),
        };

        let state_path: PathBuf = match (args.state.as_ref(), config.state_path.as_ref()) {
            (Some(s), _) => PathBuf::from(s),
            (None, Some(s)) => config_dir.join(s),
            (None, None) => PathBuf::from(DEFAULT_STATE_PATH),
        };

        Ok(Settings {
            state_path,
            contest_name: config.contest_name.clone(),
            seed_candidates: config.seed_candidates()?,
            reference_path: args.reference.as_ref().map(PathBuf::from),
        })
    }
}

fn read_js_id(x: &JSValue) -> ElectorResult<String> {
    match x {
        JSValue::String(s) => Ok(s.clone()),
        JSValue::Number(n) if n.is_u64() || n.is_i64() => Ok(n.to_string()),
        _ => None.context(ParsingJsonIdSnafu {
            value: x.to_string(),
        }),
    }
}
