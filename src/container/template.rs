//! Dockerfile template rendering and image naming

use regex::Regex;
use std::sync::OnceLock;

/// Placeholder replaced by the base image reference
pub const BASE_IMAGE_PLACEHOLDER: &str = "${base.image}";

/// Prefix of every image built by the harness
pub const IMAGE_NAME_PREFIX: &str = "jmx_exporter_test_";

pub fn render_dockerfile(template: &str, base_image: &str) -> String {
    template.replace(BASE_IMAGE_PLACEHOLDER, base_image)
}

/// Local image name for a base image, e.g. `openjdk:8-jre` becomes
/// `jmx_exporter_test_openjdk_8_jre`
pub fn image_name(base_image: &str) -> String {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let separators = SEPARATORS.get_or_init(|| Regex::new("[:/-]").expect("valid regex"));
    format!(
        "{}{}",
        IMAGE_NAME_PREFIX,
        separators.replace_all(base_image, "_")
    )
}

pub fn agent_jar_name(version: &str) -> String {
    format!("jmx_prometheus_javaagent-{}.jar", version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_dockerfile() {
        assert_eq!(
            render_dockerfile("FROM ${base.image}\n", "openjdk:8-jre"),
            "FROM openjdk:8-jre\n"
        );
    }

    #[test]
    fn test_render_dockerfile_replaces_every_placeholder() {
        let rendered = render_dockerfile(
            "FROM ${base.image}\nLABEL base=${base.image}\nCOPY config.yml /\n",
            "ibmjava:8-jre",
        );
        assert!(!rendered.contains(BASE_IMAGE_PLACEHOLDER));
        assert_eq!(rendered.matches("ibmjava:8-jre").count(), 2);
        assert!(rendered.ends_with("COPY config.yml /\n"));
    }

    #[test]
    fn test_image_name() {
        assert_eq!(image_name("openjdk:8-jre"), "jmx_exporter_test_openjdk_8_jre");
        assert_eq!(
            image_name("adoptopenjdk/openjdk16:ubi-minimal-jre"),
            "jmx_exporter_test_adoptopenjdk_openjdk16_ubi_minimal_jre"
        );
        assert_eq!(image_name("ticketfly/java:6"), "jmx_exporter_test_ticketfly_java_6");
    }

    #[test]
    fn test_agent_jar_name() {
        assert_eq!(
            agent_jar_name("0.16.2-SNAPSHOT"),
            "jmx_prometheus_javaagent-0.16.2-SNAPSHOT.jar"
        );
    }
}
