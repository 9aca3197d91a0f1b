use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template '{template}' has an unterminated placeholder at byte {offset}")]
    Unterminated { template: String, offset: usize },

    #[error("template '{template}' has an invalid placeholder '{placeholder}' at byte {offset}")]
    InvalidPlaceholder {
        template: String,
        placeholder: String,
        offset: usize,
    },

    #[error("template '{template}' is missing values for: {}", .missing.join(", "))]
    MissingParameters {
        template: String,
        missing: Vec<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A job-script template with `{{ key }}` placeholders.
#[derive(Clone, Debug)]
pub struct JobTemplate {
    name: String,
    segments: Vec<Segment>,
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl JobTemplate {
    pub fn parse(name: impl Into<String>, source: &str) -> Result<JobTemplate, TemplateError> {
        let name = name.into();
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;
        while let Some(start) = rest.find(OPEN) {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after_open = &rest[start + OPEN.len()..];
            let end = after_open
                .find(CLOSE)
                .ok_or_else(|| TemplateError::Unterminated {
                    template: name.clone(),
                    offset: offset + start,
                })?;
            let key = after_open[..end].trim();
            if !is_valid_key(key) {
                return Err(TemplateError::InvalidPlaceholder {
                    template: name.clone(),
                    placeholder: after_open[..end].to_string(),
                    offset: offset + start,
                });
            }
            segments.push(Segment::Placeholder(key.to_string()));
            let consumed = start + OPEN.len() + end + CLOSE.len();
            rest = &rest[consumed..];
            offset += consumed;
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Ok(JobTemplate { name, segments })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every key the template needs a value for.
    pub fn placeholders(&self) -> BTreeSet<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(key) => Some(key.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Fails with every placeholder that has no value in `params`.
    pub fn check(&self, params: &HashMap<String, String>) -> Result<(), TemplateError> {
        let missing: Vec<String> = self
            .placeholders()
            .into_iter()
            .filter(|key| !params.contains_key(*key))
            .map(String::from)
            .collect();
        if !missing.is_empty() {
            return Err(TemplateError::MissingParameters {
                template: self.name.clone(),
                missing,
            });
        }
        Ok(())
    }

    /// Substitutes all placeholders. Fails without producing any text when a key has no value.
    pub fn render(&self, params: &HashMap<String, String>) -> Result<String, TemplateError> {
        self.check(params)?;
        let mut ret = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => ret += text,
                Segment::Placeholder(key) => ret += &params[key],
            }
        }
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn renders_all_placeholders() {
        let template =
            JobTemplate::parse("t", "#SBATCH --job-name={{name}}\npython x.py --model {{ model }}")
                .unwrap();
        let text = template
            .render(&params(&[("name", "A1"), ("model", "M1"), ("extra", "ignored")]))
            .unwrap();
        assert_eq!(text, "#SBATCH --job-name=A1\npython x.py --model M1");
        assert!(!text.contains(OPEN));
        assert!(!text.contains(CLOSE));
    }

    #[test]
    fn repeated_placeholder_is_listed_once() {
        let template = JobTemplate::parse("t", "{{a}}/{{b}}/{{a}}").unwrap();
        assert_eq!(template.placeholders().into_iter().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(
            template.render(&params(&[("a", "x"), ("b", "y")])).unwrap(),
            "x/y/x"
        );
    }

    #[test]
    fn missing_parameters_fail_with_their_names() {
        let template = JobTemplate::parse("simulate", "{{name}} {{model}} {{run}}").unwrap();
        let err = template.render(&params(&[("model", "M1")])).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingParameters {
                template: "simulate".to_string(),
                missing: vec!["name".to_string(), "run".to_string()],
            }
        );
        assert!(err.to_string().contains("name, run"));
        assert_eq!(template.check(&params(&[("model", "M1")])), Err(err));
        assert!(
            template
                .check(&params(&[("name", "A1"), ("model", "M1"), ("run", "1")]))
                .is_ok()
        );
    }

    #[test]
    fn shell_syntax_passes_through() {
        let source = "echo $SCRATCH ${SLURM_CPUS_PER_TASK} `date +%s` $(echo \"}\")";
        let template = JobTemplate::parse("t", source).unwrap();
        assert!(template.placeholders().is_empty());
        assert_eq!(template.render(&HashMap::new()).unwrap(), source);
    }

    #[test]
    fn malformed_placeholders_are_rejected() {
        assert_eq!(
            JobTemplate::parse("t", "ok {{name").unwrap_err(),
            TemplateError::Unterminated {
                template: "t".to_string(),
                offset: 3
            }
        );
        assert!(matches!(
            JobTemplate::parse("t", "{{ }}"),
            Err(TemplateError::InvalidPlaceholder { .. })
        ));
        assert!(matches!(
            JobTemplate::parse("t", "{{na me}}"),
            Err(TemplateError::InvalidPlaceholder { .. })
        ));
    }
}
