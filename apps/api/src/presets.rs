/// A canned job description the user can pick instead of typing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetRole {
    pub title: &'static str,
    pub description: &'static str,
}

pub const PRESET_ROLES: &[PresetRole] = &[
    PresetRole {
        title: "Frontend Developer",
        description: "We are hiring a Frontend Developer to build the client side of our web applications.

Responsibilities:
- Turn product designs into accessible, responsive interfaces.
- Keep page load and interaction latency low.
- Work with backend engineers on API contracts.

Requirements:
- Professional experience with HTML5, CSS3 and modern JavaScript or TypeScript.
- Hands-on work with React, Vue or Angular.
- Familiarity with asynchronous data fetching and client-side state management.",
    },
    PresetRole {
        title: "Backend Developer",
        description: "We are hiring a Backend Developer to own the server side of our products.

Responsibilities:
- Design and implement HTTP APIs and background jobs.
- Model data and tune queries against relational databases.
- Debug production issues and improve observability.

Requirements:
- Strong experience with at least one of Rust, Go, Java or Python.
- Solid SQL and schema design skills.
- Understanding of caching, queues and service-to-service authentication.",
    },
    PresetRole {
        title: "DevOps Engineer",
        description: "We are hiring a DevOps Engineer to run and automate our delivery pipeline.

Responsibilities:
- Maintain CI/CD pipelines and infrastructure as code.
- Operate container workloads on Kubernetes.
- Define alerting and drive incident follow-ups.

Requirements:
- Experience with Terraform or a comparable provisioning tool.
- Working knowledge of AWS, GCP or Azure.
- Scripting in Bash or Python.",
    },
    PresetRole {
        title: "Data Scientist",
        description: "We are hiring a Data Scientist to turn product data into decisions.

Responsibilities:
- Build and validate predictive models.
- Design experiments and analyse their outcomes.
- Present findings to product and leadership.

Requirements:
- Strong statistics background.
- Fluency in Python with pandas and scikit-learn.
- Experience writing production SQL.",
    },
    PresetRole {
        title: "Product Manager",
        description: "We are hiring a Product Manager to set strategy and roadmap for a product line.

Responsibilities:
- Gather customer and market input and translate it into requirements.
- Prioritise the roadmap with engineering and design.
- Define success metrics and track them after launch.

Requirements:
- Prior product management experience on a shipped software product.
- Clear written and verbal communication.
- Comfort working with data to make trade-offs.",
    },
];

/// Looks a preset up by its exact title.
pub fn find_preset(title: &str) -> Option<&'static PresetRole> {
    PRESET_ROLES.iter().find(|p| p.title == title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_preset_by_title() {
        let preset = find_preset("DevOps Engineer").unwrap();
        assert!(preset.description.contains("Kubernetes"));
        assert!(find_preset("devops engineer").is_none());
    }

    #[test]
    fn test_titles_are_unique() {
        for (i, a) in PRESET_ROLES.iter().enumerate() {
            assert!(PRESET_ROLES[i + 1..].iter().all(|b| b.title != a.title));
        }
    }
}
