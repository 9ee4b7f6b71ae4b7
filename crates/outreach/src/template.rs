use tracing::debug;

/// Renders an outreach body template with the candidate's name available as
/// `{{ name }}`. A template that fails to render falls back to the raw
/// template string; a bad template must never abort a send.
pub fn render_body(template: &str, name: &str) -> String {
    let mut context = tera::Context::new();
    context.insert("name", name);

    match tera::Tera::one_off(template, &context, false) {
        Ok(rendered) => rendered,
        Err(error) => {
            debug!(error = %error, "body template render failed; using raw template");
            template.to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::render_body;

    #[test]
    fn substitutes_the_candidate_name() {
        assert_eq!(
            render_body("Hi {{ name }}, we'd love to invite you.", "Ada"),
            "Hi Ada, we'd love to invite you."
        );
    }

    #[test]
    fn broken_template_falls_back_to_the_raw_string() {
        let broken = "Hi {{ name, we'd love to invite you.";
        assert_eq!(render_body(broken, "Ada"), broken);
    }

    #[test]
    fn template_without_placeholder_passes_through() {
        assert_eq!(render_body("Hello there.", "Ada"), "Hello there.");
    }
}
