use cronrepo_core::TaskBody;

use crate::engine::JobDetail;

/// A ready-made job descriptor, scheduled as-is.
#[derive(Debug, Clone)]
pub struct JobDetailTaskBody {
    detail: JobDetail,
}

impl JobDetailTaskBody {
    pub fn new(detail: JobDetail) -> Self {
        Self { detail }
    }

    pub fn detail(&self) -> &JobDetail {
        &self.detail
    }

    pub fn into_detail(self) -> JobDetail {
        self.detail
    }
}

impl From<JobDetail> for JobDetailTaskBody {
    fn from(detail: JobDetail) -> Self {
        Self::new(detail)
    }
}

impl TaskBody for JobDetailTaskBody {
    fn kind(&self) -> &'static str {
        "JobDetailTaskBody"
    }
}
