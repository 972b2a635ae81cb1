use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Page structure currently presented by the rendering session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutVariant {
    Authenticated,
    Public,
    /// Interstitial (login wall, verification challenge) that a human must clear.
    Blocked,
}

impl LayoutVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutVariant::Authenticated => "authenticated",
            LayoutVariant::Public => "public",
            LayoutVariant::Blocked => "blocked",
        }
    }
}

impl fmt::Display for LayoutVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "authenticated" => Ok(LayoutVariant::Authenticated),
            "public" => Ok(LayoutVariant::Public),
            "blocked" => Ok(LayoutVariant::Blocked),
            other => Err(anyhow::anyhow!("unknown layout variant: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    pub position_title: Option<String>,
    pub company: Option<String>,
    pub from_date: Option<String>,
    /// `Present` for an ongoing role.
    pub to_date: Option<String>,
    pub duration: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accomplishment {
    pub category: String,
    pub title: String,
}

/// Identity fields read from the top card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub name: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
}

/// Output of one section extractor, folded into the record by the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionData {
    Identity(Identity),
    Summary(Option<String>),
    Experiences(Vec<Experience>),
    Educations(Vec<Education>),
    Interests(Vec<Interest>),
    Accomplishments(Vec<Accomplishment>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub url: Option<String>,
    pub layout: LayoutVariant,
    pub name: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    pub experiences: Vec<Experience>,
    pub educations: Vec<Education>,
    pub interests: Vec<Interest>,
    pub accomplishments: Vec<Accomplishment>,
}

impl ProfileRecord {
    pub fn new(url: Option<String>, layout: LayoutVariant) -> Self {
        ProfileRecord {
            url,
            layout,
            name: None,
            title: None,
            location: None,
            summary: None,
            experiences: Vec::new(),
            educations: Vec::new(),
            interests: Vec::new(),
            accomplishments: Vec::new(),
        }
    }

    pub fn add_experience(&mut self, experience: Experience) {
        self.experiences.push(experience);
    }

    pub fn add_education(&mut self, education: Education) {
        self.educations.push(education);
    }

    pub fn add_interest(&mut self, interest: Interest) {
        self.interests.push(interest);
    }

    pub fn add_accomplishment(&mut self, accomplishment: Accomplishment) {
        self.accomplishments.push(accomplishment);
    }

    pub fn set_location(&mut self, location: Option<String>) {
        if location.is_some() {
            self.location = location;
        }
    }

    /// Fold one section's output into the record, preserving document order.
    pub fn absorb(&mut self, data: SectionData) {
        match data {
            SectionData::Identity(identity) => {
                self.name = identity.name;
                self.title = identity.title;
                self.set_location(identity.location);
            }
            SectionData::Summary(summary) => self.summary = summary,
            SectionData::Experiences(items) => items.into_iter().for_each(|e| self.add_experience(e)),
            SectionData::Educations(items) => items.into_iter().for_each(|e| self.add_education(e)),
            SectionData::Interests(items) => items.into_iter().for_each(|i| self.add_interest(i)),
            SectionData::Accomplishments(items) => {
                items.into_iter().for_each(|a| self.add_accomplishment(a))
            }
        }
    }
}

fn or_dash(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or("-")
}

impl fmt::Display for Experience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} from {} to {} for {} based at {}",
            or_dash(&self.position_title),
            or_dash(&self.company),
            or_dash(&self.from_date),
            or_dash(&self.to_date),
            or_dash(&self.duration),
            or_dash(&self.location),
        )
    }
}

impl fmt::Display for Education {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} from {} to {}",
            or_dash(&self.degree),
            or_dash(&self.institution),
            or_dash(&self.from_date),
            or_dash(&self.to_date),
        )
    }
}

impl fmt::Display for ProfileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}\n", or_dash(&self.name))?;
        writeln!(f, "{}\n", or_dash(&self.title))?;
        writeln!(f, "{}\n", or_dash(&self.location))?;
        writeln!(f, "{}\n", or_dash(&self.summary))?;

        writeln!(f, "Experience")?;
        for e in &self.experiences {
            writeln!(f, "  {}", e)?;
        }
        writeln!(f, "\nEducation")?;
        for e in &self.educations {
            writeln!(f, "  {}", e)?;
        }
        writeln!(f, "\nInterest")?;
        for i in &self.interests {
            writeln!(f, "  {}", i.label)?;
        }
        writeln!(f, "\nAccomplishments")?;
        for a in &self.accomplishments {
            writeln!(f, "  {}: {}", a.category, a.title)?;
        }
        Ok(())
    }
}
