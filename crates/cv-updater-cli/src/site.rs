//! work.ua locations and selectors.

use regex::Regex;

pub const RESUME_LIST_URL: &str = "https://www.work.ua/ru/jobseeker/my/resumes/";
pub const LOGIN_URL: &str = "https://www.work.ua/jobseeker/login/";

pub const UPDATE_BUTTON_XPATH: &str = "//a[contains(@href, '/update/expire_date')]";
pub const CREATE_BUTTON_XPATH: &str = "//a[contains(@href, '/jobseeker/my/resumes/create')]";

const RESUME_LIST_URL_PATTERN: &str = r"^https://www\.work\.ua/(ru/)?jobseeker/my/resumes/?$";
const POST_LOGIN_URL_PATTERN: &str = r"^https://www\.work\.ua/(ru/)?jobseeker/my/?$";
const CREATE_URL_PATTERN: &str =
    r"^https://www\.work\.ua/(ru/)?jobseeker/my/resumes/create/?(\?.*)?$";

/// Compiled URL patterns the steps wait on.
#[derive(Debug, Clone)]
pub struct UrlPatterns {
    pub resume_list: Regex,
    pub post_login: Regex,
    pub create: Regex,
}

impl UrlPatterns {
    pub fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            resume_list: Regex::new(RESUME_LIST_URL_PATTERN)?,
            post_login: Regex::new(POST_LOGIN_URL_PATTERN)?,
            create: Regex::new(CREATE_URL_PATTERN)?,
        })
    }
}
