//! Bundled course groups.

use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use serde_json::from_str;
use strum_macros::Display;

use crate::error::CatalogError;
use crate::item::{Item, Term};

static COURSE_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/courses");

/// Group whose courses double as the leveled supplement pool.
pub const COMMON_GROUP_ID: &str = "common";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CourseCategory {
    Pinyin,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "data")]
    pub items: Vec<Item>,
}

impl Course {
    pub fn question_count(&self) -> usize {
        self.items.iter().map(Item::question_count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseGroup {
    pub id: String,
    pub title: String,
    pub category: CourseCategory,
    #[serde(default)]
    pub order: u32,
    pub courses: Vec<Course>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    groups: Vec<CourseGroup>,
}

impl Catalog {
    /// Load every group shipped with the binary, ordered by `order` then id.
    pub fn load_course_catalog() -> Result<Self, CatalogError> {
        let mut groups = Vec::new();
        for file in COURSE_DIR.files() {
            if file.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let name = file.path().display().to_string();
            let text = file
                .contents_utf8()
                .ok_or_else(|| CatalogError::MissingFile(file.path().to_path_buf()))?;
            let group: CourseGroup =
                from_str(text).map_err(|source| CatalogError::Parse { file: name, source })?;
            groups.push(group);
        }
        Ok(Self::from_groups(groups))
    }

    pub fn from_groups(mut groups: Vec<CourseGroup>) -> Self {
        groups.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Self { groups }
    }

    pub fn groups(&self) -> &[CourseGroup] {
        &self.groups
    }

    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.groups.iter().flat_map(|g| g.courses.iter())
    }

    pub fn find_course(&self, id: &str) -> Option<&Course> {
        self.courses().find(|c| c.id == id)
    }

    pub fn course(&self, id: &str) -> Result<&Course, CatalogError> {
        self.find_course(id)
            .ok_or_else(|| CatalogError::UnknownCourse(id.to_string()))
    }

    /// Plain terms of the common course at `level`, falling back to level 1.
    pub fn common_level(&self, level: u32) -> Vec<&Term> {
        let Some(group) = self.groups.iter().find(|g| g.id == COMMON_GROUP_ID) else {
            return Vec::new();
        };
        let course_for = |lv: u32| {
            let id = format!("common-lv{lv}");
            group.courses.iter().find(|c| c.id == id)
        };
        course_for(level)
            .or_else(|| course_for(1))
            .map(|c| c.items.iter().filter_map(Item::as_term).collect())
            .unwrap_or_default()
    }
}
