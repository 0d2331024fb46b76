use sb_domain::config::{Config, ConfigSeverity};

/// Parse and validate the config, printing any issues.
///
/// Returns `true` when no errors were found (warnings are allowed).
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!(
        "\n{} error(s), {} warning(s) in {config_path}",
        error_count, warning_count,
    );

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML.
/// Inline provider keys are masked.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(&redacted(config))
        .map_err(|e| anyhow::anyhow!("serializing config: {e}"))?;
    print!("{output}");
    Ok(())
}

fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    for provider in &mut config.llm.providers {
        if provider.auth.key.is_some() {
            provider.auth.key = Some("********".into());
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_masks_inline_keys() {
        let config: Config = toml::from_str(
            r#"
            [[llm.providers]]
            id = "openai"
            kind = "openai_compat"
            base_url = "https://api.openai.com/v1"
            auth = { key = "sk-secret" }
            "#,
        )
        .unwrap();
        let out = toml::to_string_pretty(&redacted(&config)).unwrap();
        assert!(!out.contains("sk-secret"));
        assert!(out.contains("********"));
    }

    #[test]
    fn default_config_fails_validation_without_providers() {
        assert!(!validate(&Config::default(), "config.toml"));
    }
}
