//! Launch error states and the server's launch error codes.

use std::fmt;

use serde::{Serialize, Serializer};

/// Server error codes the launch page knows how to explain.
///
/// The backend may send codes not listed here; [`LaunchErrorCode::from_code`]
/// returns `None` for them and the caller falls back to a generic state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaunchErrorCode {
    BlackboardFileNotFoundInCourse,
    BlackboardGroupSetEmpty,
    BlackboardGroupSetNotFound,
    BlackboardStudentNotInGroup,
    CanvasApiPermissionError,
    CanvasFileNotFoundInCourse,
    CanvasPageNotFoundInCourse,
    CanvasGroupSetEmpty,
    CanvasGroupSetNotFound,
    CanvasStudentNotInGroup,
    D2lFileNotFoundInCourseInstructor,
    D2lFileNotFoundInCourseStudent,
    D2lGroupSetEmpty,
    D2lGroupSetNotFound,
    D2lStudentNotInGroup,
    MoodleFileNotFoundInCourse,
    MoodlePageNotFoundInCourse,
    MoodleGroupSetEmpty,
    MoodleGroupSetNotFound,
    MoodleStudentNotInGroup,
    VitalsourceUserNotFound,
    VitalsourceNoBookLicense,
}

impl LaunchErrorCode {
    /// Every known code.
    pub const ALL: [Self; 22] = [
        Self::BlackboardFileNotFoundInCourse,
        Self::BlackboardGroupSetEmpty,
        Self::BlackboardGroupSetNotFound,
        Self::BlackboardStudentNotInGroup,
        Self::CanvasApiPermissionError,
        Self::CanvasFileNotFoundInCourse,
        Self::CanvasPageNotFoundInCourse,
        Self::CanvasGroupSetEmpty,
        Self::CanvasGroupSetNotFound,
        Self::CanvasStudentNotInGroup,
        Self::D2lFileNotFoundInCourseInstructor,
        Self::D2lFileNotFoundInCourseStudent,
        Self::D2lGroupSetEmpty,
        Self::D2lGroupSetNotFound,
        Self::D2lStudentNotInGroup,
        Self::MoodleFileNotFoundInCourse,
        Self::MoodlePageNotFoundInCourse,
        Self::MoodleGroupSetEmpty,
        Self::MoodleGroupSetNotFound,
        Self::MoodleStudentNotInGroup,
        Self::VitalsourceUserNotFound,
        Self::VitalsourceNoBookLicense,
    ];

    /// Looks up a server error code. Unknown codes yield `None`.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|known| known.as_str() == code)
    }

    /// Wire form of the code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BlackboardFileNotFoundInCourse => "blackboard_file_not_found_in_course",
            Self::BlackboardGroupSetEmpty => "blackboard_group_set_empty",
            Self::BlackboardGroupSetNotFound => "blackboard_group_set_not_found",
            Self::BlackboardStudentNotInGroup => "blackboard_student_not_in_group",
            Self::CanvasApiPermissionError => "canvas_api_permission_error",
            Self::CanvasFileNotFoundInCourse => "canvas_file_not_found_in_course",
            Self::CanvasPageNotFoundInCourse => "canvas_page_not_found_in_course",
            Self::CanvasGroupSetEmpty => "canvas_group_set_empty",
            Self::CanvasGroupSetNotFound => "canvas_group_set_not_found",
            Self::CanvasStudentNotInGroup => "canvas_student_not_in_group",
            Self::D2lFileNotFoundInCourseInstructor => "d2l_file_not_found_in_course_instructor",
            Self::D2lFileNotFoundInCourseStudent => "d2l_file_not_found_in_course_student",
            Self::D2lGroupSetEmpty => "d2l_group_set_empty",
            Self::D2lGroupSetNotFound => "d2l_group_set_not_found",
            Self::D2lStudentNotInGroup => "d2l_student_not_in_group",
            Self::MoodleFileNotFoundInCourse => "moodle_file_not_found_in_course",
            Self::MoodlePageNotFoundInCourse => "moodle_page_not_found_in_course",
            Self::MoodleGroupSetEmpty => "moodle_group_set_empty",
            Self::MoodleGroupSetNotFound => "moodle_group_set_not_found",
            Self::MoodleStudentNotInGroup => "moodle_student_not_in_group",
            Self::VitalsourceUserNotFound => "vitalsource_user_not_found",
            Self::VitalsourceNoBookLicense => "vitalsource_no_book_license",
        }
    }

    /// Whether the error dialog offers "Try again" for this code.
    ///
    /// Group-set problems, a student's missing file and a missing book
    /// license need someone else to act first, so retrying cannot help.
    #[must_use]
    pub fn allows_retry(self) -> bool {
        !matches!(
            self,
            Self::BlackboardGroupSetEmpty
                | Self::BlackboardGroupSetNotFound
                | Self::BlackboardStudentNotInGroup
                | Self::CanvasGroupSetEmpty
                | Self::CanvasGroupSetNotFound
                | Self::CanvasStudentNotInGroup
                | Self::D2lFileNotFoundInCourseStudent
                | Self::D2lGroupSetEmpty
                | Self::D2lGroupSetNotFound
                | Self::D2lStudentNotInGroup
                | Self::MoodleGroupSetEmpty
                | Self::MoodleGroupSetNotFound
                | Self::MoodleStudentNotInGroup
                | Self::VitalsourceNoBookLicense
        )
    }
}

impl fmt::Display for LaunchErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the launch page shows an error dialog instead of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchErrorState {
    /// The backend needs the user to (re-)authorize.
    Authorizing,
    /// A fetch failed for a generic reason.
    Fetching,
    /// The grading submission failed. Not retryable within the session.
    ReportingSubmission,
    /// The server reported a known launch error.
    Server(LaunchErrorCode),
}

impl LaunchErrorState {
    /// Wire form: `error-authorizing`, `error-fetching`,
    /// `error-reporting-submission`, or the server code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authorizing => "error-authorizing",
            Self::Fetching => "error-fetching",
            Self::ReportingSubmission => "error-reporting-submission",
            Self::Server(code) => code.as_str(),
        }
    }

    /// Whether the dialog offers a retry action.
    #[must_use]
    pub fn allows_retry(self) -> bool {
        match self {
            Self::Authorizing | Self::Fetching => true,
            Self::ReportingSubmission => false,
            Self::Server(code) => code.allows_retry(),
        }
    }
}

impl fmt::Display for LaunchErrorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LaunchErrorState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
