use crate::api::action::{ActionResponse, SetAction};
use crate::api::dashboard::{AnalyticsResponse, DashboardResponse, HistoryPerMonthResponse};
use crate::api::history::{
    AdminHistory, AdminHistoryListResponse, CreateHistory, HistoryResponse, UpdateHistoryStatus,
};
use crate::api::public::PublicConfig;
use crate::api::recap::{
    RecapCounts, RecapResponse, StatisticsSiswa, StudentAnalysis, StudentAnalysisResponse,
    StudentStatisticsResponse,
};
use crate::api::siswa::{
    SiswaListResponse, SiswaProfileListResponse, UpdateSiswaRequest, UpdateSiswaResponse,
};
use crate::api::whatsapp::{SendMessage, SendRecap, SendResponse};
use crate::auth::handlers::LoginResponse;
use crate::model::action::Action;
use crate::model::history::History;
use crate::model::siswa::{Siswa, SiswaProfile};
use crate::model::status::{AttendanceStatus, MachineStatus};
use crate::models::{LoginReqDto, MessageResponse};
use crate::utils::aggregate::{
    AnalyticsTotal, MonthAnalytics, MonthHistory, MonthRecord, MonthRef, MonthStats,
    StatusPercentages, TotalStats,
};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Absensi RFID API",
        version = "1.0.0",
        description = r#"
## RFID Attendance Backend

Backend for a class attendance system. RFID readers write scans into the
`history` table; this API serves the student dashboard and the admin panel.

### Key Features
- **Student dashboard**
  - Today's status, monthly history and per-month analytics
- **Siswa management**
  - List students, find who has not scanned, bulk edit RFID tags
- **History management**
  - Manual Sakit/Izin/Alpha entries, status corrections, deletions
- **Machine flag**
  - Turn today's attendance machine on or off
- **Recap & statistics**
  - Daily recap, class ranking, one year of per-student statistics
- **WhatsApp**
  - Forward messages and daily recaps through a WhatsApp gateway

### Security
Dashboard and admin endpoints need a **JWT Bearer** token from `/auth/login`.
Admin endpoints additionally require `role = admin`.
"#,
    ),
    paths(
        crate::api::public::index,
        crate::api::public::public_config,

        crate::auth::handlers::login,

        crate::api::dashboard::get_dashboard,
        crate::api::dashboard::history_per_month,
        crate::api::dashboard::analytics,

        crate::api::siswa::list_siswa,
        crate::api::siswa::siswa_belum_absen,
        crate::api::siswa::update_siswa,

        crate::api::history::list_history,
        crate::api::history::create_history,
        crate::api::history::update_history_status,
        crate::api::history::delete_history,

        crate::api::action::get_action_today,
        crate::api::action::set_action_today,

        crate::api::recap::today_recap,
        crate::api::recap::student_analysis,
        crate::api::recap::student_statistics,

        crate::api::whatsapp::send_whatsapp,
        crate::api::whatsapp::send_recap
    ),
    components(
        schemas(
            MessageResponse,
            LoginReqDto,
            LoginResponse,
            Siswa,
            SiswaProfile,
            History,
            Action,
            AttendanceStatus,
            MachineStatus,
            DashboardResponse,
            HistoryPerMonthResponse,
            AnalyticsResponse,
            MonthRef,
            MonthRecord,
            MonthHistory,
            MonthAnalytics,
            AnalyticsTotal,
            MonthStats,
            TotalStats,
            StatusPercentages,
            SiswaListResponse,
            SiswaProfileListResponse,
            UpdateSiswaRequest,
            UpdateSiswaResponse,
            AdminHistory,
            AdminHistoryListResponse,
            CreateHistory,
            HistoryResponse,
            UpdateHistoryStatus,
            ActionResponse,
            SetAction,
            RecapCounts,
            RecapResponse,
            StudentAnalysis,
            StudentAnalysisResponse,
            StatisticsSiswa,
            StudentStatisticsResponse,
            SendMessage,
            SendRecap,
            SendResponse,
            PublicConfig
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Public", description = "Health and browser configuration"),
        (name = "Auth", description = "Student login"),
        (name = "Dashboard", description = "Student dashboard APIs"),
        (name = "Siswa", description = "Student management APIs"),
        (name = "History", description = "Attendance record APIs"),
        (name = "Action", description = "Daily machine flag APIs"),
        (name = "Recap", description = "Recap and statistics APIs"),
        (name = "WhatsApp", description = "WhatsApp forwarding APIs"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by the protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
