use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::Error;

/// Run the derived rules on a request body.
pub fn validate_request<T: Validate>(request: &T) -> Result<(), Error> {
    request.validate().map_err(|errors| Error::Validation(describe(&errors)))
}

/// Rejects strings that are empty once trimmed.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}

fn describe(errors: &ValidationErrors) -> String {
    let mut fields = Vec::new();
    collect(errors, "", &mut fields);
    fields.sort();
    fields.join("; ")
}

/// Flatten nested struct and list errors into `path: reasons` lines, e.g.
/// `questions[0].correct_index: range`.
fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(problems) => {
                let reasons: Vec<String> = problems
                    .iter()
                    .map(|problem| {
                        problem
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| problem.code.to_string())
                    })
                    .collect();
                out.push(format!("{}: {}", path, reasons.join(", ")));
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}
