/*
 * Copyright 2024 Fluence Labs Limited
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use config::Config;
use config::Environment;
use config::File;
use config::FileFormat;
use config::Map;
use eyre::Context;

use crate::unresolved_config::UnresolvedRdtConfig;
use crate::RdtConfig;

const ENV_PREFIX: &str = "RDT";
const ENV_SEPARATOR: &str = "__";

/// Loads the TOML file at `path`, `RDT_`-prefixed environment variables override it.
/// Nested keys are separated by a double underscore, e.g. `RDT_RESET__L3_CDP=on`
/// overrides `l3-cdp` in the `[reset]` table.
pub fn load_config(path: &str) -> eyre::Result<RdtConfig> {
    load_config_with_env(path, std::env::vars().collect())
}

pub(crate) fn load_config_with_env(
    path: &str,
    env: Map<String, String>,
) -> eyre::Result<RdtConfig> {
    let config_source = File::with_name(path)
        .required(true)
        .format(FileFormat::Toml);
    let environment_source = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator(ENV_SEPARATOR)
        .source(Some(kebab_case_keys(env)));
    let config = Config::builder()
        .add_source(config_source)
        .add_source(environment_source)
        .build()
        .with_context(|| format!("Failed to load config from {path}"))?;

    let config: UnresolvedRdtConfig = config
        .try_deserialize()
        .with_context(|| format!("Failed to parse config at {path}"))?;
    config.resolve(path)
}

/// Config keys are kebab-case, but variable names can't carry dashes:
/// `RDT_RESET__L3_CDP` becomes `RDT_RESET__L3-CDP`.
fn kebab_case_keys(env: Map<String, String>) -> Map<String, String> {
    let prefix = format!("{ENV_PREFIX}_");

    env.into_iter()
        .map(|(key, value)| match key.strip_prefix(&prefix) {
            Some(name) => {
                let name = name
                    .split(ENV_SEPARATOR)
                    .map(|segment| segment.replace('_', "-"))
                    .collect::<Vec<_>>()
                    .join(ENV_SEPARATOR);
                (format!("{prefix}{name}"), value)
            }
            None => (key, value),
        })
        .collect()
}
