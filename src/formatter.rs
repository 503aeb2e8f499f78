//! Formatters turning profile records into labeled, human-readable text
//! blocks for indexing. Deterministic: the same record always produces the
//! same text. Absent optional fields are omitted, never rendered empty.

use chrono::NaiveDate;

use crate::profile::{Education, ProfileBasics, Project, SkillCategory, WorkExperience};

fn month_year(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// Format profile basics into searchable text.
#[must_use]
pub fn format_profile_basics(basics: &ProfileBasics) -> String {
    let mut parts = Vec::new();

    parts.push(format!("Name: {}", basics.full_name));

    if let Some(title) = &basics.job_title {
        parts.push(format!("Job Title: {title}"));
    }
    if let Some(location) = &basics.location {
        parts.push(format!("Location: {location}"));
    }
    if let Some(summary) = &basics.summary {
        parts.push(format!("\nProfessional Summary:\n{summary}"));
    }
    if let Some(bio) = &basics.bio {
        parts.push(format!("\nBiography:\n{bio}"));
    }

    let mut contact = Vec::new();
    if let Some(email) = &basics.email {
        contact.push(format!("Email: {email}"));
    }
    if let Some(phone) = &basics.phone {
        contact.push(format!("Phone: {phone}"));
    }
    if let Some(linkedin) = &basics.linkedin_url {
        contact.push(format!("LinkedIn: {linkedin}"));
    }
    if let Some(github) = &basics.github_url {
        contact.push(format!("GitHub: {github}"));
    }
    if !contact.is_empty() {
        parts.push(format!("\nContact Information:\n{}", contact.join("\n")));
    }

    parts.join("\n")
}

/// Format a work experience entry into searchable text.
#[must_use]
pub fn format_work_experience(exp: &WorkExperience) -> String {
    let mut parts = Vec::new();

    parts.push(format!("Position: {} at {}", exp.position, exp.company_name));

    let end = if exp.is_current {
        "Present".to_string()
    } else {
        exp.end_date.map_or_else(|| "Unknown".to_string(), month_year)
    };
    parts.push(format!("Period: {} - {}", month_year(exp.start_date), end));

    if let Some(location) = &exp.location {
        parts.push(format!("Location: {location}"));
    }
    if let Some(description) = &exp.description {
        parts.push(format!("\nDescription:\n{description}"));
    }
    if !exp.achievements.is_empty() {
        parts.push("\nKey Achievements:".to_string());
        for achievement in &exp.achievements {
            parts.push(format!("- {achievement}"));
        }
    }
    if !exp.technologies.is_empty() {
        parts.push(format!("\nTechnologies used: {}", exp.technologies.join(", ")));
    }

    parts.join("\n")
}

/// Format a project into searchable text.
#[must_use]
pub fn format_project(project: &Project) -> String {
    let mut parts = Vec::new();

    parts.push(format!("Project: {}", project.name));

    if let Some(role) = &project.role {
        parts.push(format!("Role: {role}"));
    }
    if let Some(short) = &project.short_description {
        parts.push(format!("\n{short}"));
    }
    if let Some(full) = &project.full_description {
        parts.push(format!("\nDetailed Description:\n{full}"));
    }
    if !project.highlights.is_empty() {
        parts.push("\nKey Highlights:".to_string());
        for highlight in &project.highlights {
            parts.push(format!("- {highlight}"));
        }
    }
    if !project.technologies.is_empty() {
        parts.push(format!("\nTechnologies: {}", project.technologies.join(", ")));
    }
    if let Some(url) = &project.project_url {
        parts.push(format!("\nProject URL: {url}"));
    }
    if let Some(github) = &project.github_url {
        parts.push(format!("GitHub: {github}"));
    }

    parts.join("\n")
}

/// Format a skill category and its skills into searchable text.
#[must_use]
pub fn format_skill_category(category: &SkillCategory) -> String {
    let mut parts = Vec::new();

    parts.push(format!("Skill Category: {}", category.name));
    parts.push("\nSkills:".to_string());

    for skill in &category.skills {
        let mut line = format!("- {}", skill.name);
        if let Some(level) = &skill.proficiency_level {
            line.push_str(&format!(" ({level})"));
        }
        if let Some(years) = skill.years_of_experience {
            line.push_str(&format!(" - {years} years of experience"));
        }
        parts.push(line);
    }

    parts.join("\n")
}

/// Format an education entry into searchable text.
#[must_use]
pub fn format_education(edu: &Education) -> String {
    let mut parts = Vec::new();

    parts.push(format!("Education: {}", edu.institution));

    if let Some(degree) = &edu.degree {
        parts.push(format!("Degree: {degree}"));
    }
    if let Some(field) = &edu.field_of_study {
        parts.push(format!("Field of Study: {field}"));
    }
    if let Some(location) = &edu.location {
        parts.push(format!("Location: {location}"));
    }
    if let (Some(start), Some(end)) = (edu.start_date, edu.end_date) {
        parts.push(format!("Period: {} - {}", start.format("%Y"), end.format("%Y")));
    }
    if let Some(grade) = &edu.grade {
        parts.push(format!("Grade: {grade}"));
    }
    if let Some(description) = &edu.description {
        parts.push(format!("\n{description}"));
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Skill;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_basics_minimal() {
        let basics = ProfileBasics {
            id: 1,
            full_name: "Ada Lovelace".to_string(),
            job_title: None,
            location: None,
            summary: None,
            bio: None,
            email: None,
            phone: None,
            linkedin_url: None,
            github_url: None,
        };
        let text = format_profile_basics(&basics);
        assert_eq!(text, "Name: Ada Lovelace");
        // No empty placeholders for missing fields
        assert!(!text.contains("Job Title"));
        assert!(!text.contains("Contact Information"));
    }

    #[test]
    fn test_format_basics_with_contact() {
        let basics = ProfileBasics {
            id: 1,
            full_name: "Ada Lovelace".to_string(),
            job_title: Some("Engineer".to_string()),
            location: None,
            summary: Some("Pioneer of computing.".to_string()),
            bio: None,
            email: Some("ada@example.com".to_string()),
            phone: None,
            linkedin_url: None,
            github_url: Some("https://github.com/ada".to_string()),
        };
        let text = format_profile_basics(&basics);
        assert!(text.contains("Job Title: Engineer"));
        assert!(text.contains("Professional Summary:\nPioneer of computing."));
        assert!(text.contains("Contact Information:\nEmail: ada@example.com\nGitHub:"));
    }

    #[test]
    fn test_format_work_experience_current() {
        let exp = WorkExperience {
            id: 1,
            company_name: "Acme".to_string(),
            position: "Backend Developer".to_string(),
            start_date: date(2021, 3, 1),
            end_date: None,
            is_current: true,
            location: Some("Berlin".to_string()),
            description: Some("Built APIs.".to_string()),
            achievements: vec!["Cut latency by half".to_string()],
            technologies: vec!["Go".to_string(), "PostgreSQL".to_string()],
        };
        let text = format_work_experience(&exp);
        assert!(text.starts_with("Position: Backend Developer at Acme"));
        assert!(text.contains("Period: March 2021 - Present"));
        assert!(text.contains("Key Achievements:\n- Cut latency by half"));
        assert!(text.contains("Technologies used: Go, PostgreSQL"));
    }

    #[test]
    fn test_format_work_experience_ended() {
        let exp = WorkExperience {
            id: 2,
            company_name: "Initech".to_string(),
            position: "Engineer".to_string(),
            start_date: date(2018, 1, 15),
            end_date: Some(date(2020, 6, 30)),
            is_current: false,
            location: None,
            description: None,
            achievements: vec![],
            technologies: vec![],
        };
        let text = format_work_experience(&exp);
        assert!(text.contains("Period: January 2018 - June 2020"));
        assert!(!text.contains("Achievements"));
        assert!(!text.contains("Technologies"));
    }

    #[test]
    fn test_format_project() {
        let project = Project {
            id: 1,
            name: "ragfolio".to_string(),
            role: Some("Author".to_string()),
            short_description: Some("RAG over a personal profile.".to_string()),
            full_description: None,
            highlights: vec!["Streams tokens".to_string()],
            technologies: vec!["Rust".to_string()],
            project_url: None,
            github_url: Some("https://github.com/ragfolio/ragfolio".to_string()),
        };
        let text = format_project(&project);
        assert!(text.starts_with("Project: ragfolio"));
        assert!(text.contains("Role: Author"));
        assert!(text.contains("Key Highlights:\n- Streams tokens"));
        assert!(text.contains("Technologies: Rust"));
        assert!(!text.contains("Project URL"));
    }

    #[test]
    fn test_format_skill_category() {
        let category = SkillCategory {
            id: 1,
            name: "Languages".to_string(),
            skills: vec![
                Skill {
                    name: "Rust".to_string(),
                    proficiency_level: Some("Advanced".to_string()),
                    years_of_experience: Some(4),
                },
                Skill {
                    name: "SQL".to_string(),
                    proficiency_level: None,
                    years_of_experience: None,
                },
            ],
        };
        let text = format_skill_category(&category);
        assert!(text.starts_with("Skill Category: Languages"));
        assert!(text.contains("- Rust (Advanced) - 4 years of experience"));
        assert!(text.contains("- SQL\n") || text.ends_with("- SQL"));
    }

    #[test]
    fn test_format_education() {
        let edu = Education {
            id: 1,
            institution: "TU Berlin".to_string(),
            degree: Some("MSc".to_string()),
            field_of_study: Some("Computer Science".to_string()),
            location: None,
            start_date: Some(date(2014, 10, 1)),
            end_date: Some(date(2016, 9, 30)),
            grade: None,
            description: None,
        };
        let text = format_education(&edu);
        assert!(text.starts_with("Education: TU Berlin"));
        assert!(text.contains("Degree: MSc"));
        assert!(text.contains("Period: 2014 - 2016"));
        assert!(!text.contains("Grade"));
    }
}
