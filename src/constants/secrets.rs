use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::{env::var, fmt::Display, str::FromStr};

const DOCKER_SECRETS_PATH: &str = "/run/secrets/";

pub fn read_secret(name: &str) -> Result<String, std::io::Error> {
    let mut secret_val = String::new();
    File::open(Path::new(DOCKER_SECRETS_PATH).join(name.to_lowercase()))?
        .read_to_string(&mut secret_val)?;
    Ok(secret_val.trim_end().to_owned())
}

/// Read `name` from the environment, falling back to the docker secret named
/// by `<name>_DOCKER_SECRET`.
pub fn var_or_secret(name: &str) -> Option<String> {
    var(name).ok().or_else(|| {
        let secret_path = var(format!("{name}_DOCKER_SECRET")).ok()?;
        Some(
            read_secret(&secret_path)
                .unwrap_or_else(|err| panic!("Failed to read {name} docker secret: {err}")),
        )
    })
}

/// Parse a raw configuration value, using `default` when it is absent.
fn parse_value<T>(name: &str, raw: Option<&str>, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => default,
        Some(value) => value
            .trim()
            .parse()
            .unwrap_or_else(|err| panic!("{name} has an invalid value {value:?}: {err}")),
    }
}

/// Parse the environment variable `name`, using `default` when it is unset.
pub fn parse_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    parse_value(name, var(name).ok().as_deref(), default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_value_uses_default() {
        assert_eq!(parse_value::<u16>("PORT", None, 5000), 5000);
    }

    #[test]
    fn present_value_is_parsed_and_trimmed() {
        assert_eq!(parse_value::<u64>("DELIVERY_FEE", Some(" 2500\n"), 4000), 2500);
    }

    #[test]
    #[should_panic(expected = "PORT has an invalid value")]
    fn invalid_value_is_fatal() {
        parse_value::<u16>("PORT", Some("eighty"), 5000);
    }
}
