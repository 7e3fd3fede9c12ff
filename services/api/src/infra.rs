use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use placement_core::placements::{
    Application, ApplicationId, ApplicationStatus, ApplicationStore, DispatchError,
    DispatchReceipt, Drive, DriveId, DriveStatus, DriveStore, EligibilityCriteria, Notification,
    NotificationDispatcher, ProfileStatus, RepositoryError, Student, StudentId, StudentStore,
};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Single-process store backing the service until a relational adapter
/// lands. One mutex covers all four tables, so the pair-uniqueness check in
/// `insert_application` is atomic, standing in for a filtered unique index
/// over (drive_id, student_id).
#[derive(Default)]
pub(crate) struct InMemoryPlacementStore {
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    drives: HashMap<DriveId, Drive>,
    students: HashMap<StudentId, Student>,
    applications: HashMap<ApplicationId, Application>,
    active_pairs: HashSet<(DriveId, StudentId)>,
}

impl DriveStore for InMemoryPlacementStore {
    fn insert_drive(&self, drive: Drive) -> Result<Drive, RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        if state.drives.contains_key(&drive.id) {
            return Err(RepositoryError::Conflict);
        }
        state.drives.insert(drive.id.clone(), drive.clone());
        Ok(drive)
    }

    fn fetch_drive(&self, id: &DriveId) -> Result<Option<Drive>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.drives.get(id).cloned())
    }

    fn list_drives(&self) -> Result<Vec<Drive>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.drives.values().cloned().collect())
    }

    fn update_drive_status(
        &self,
        id: &DriveId,
        status: DriveStatus,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let drive = state.drives.get_mut(id).ok_or(RepositoryError::NotFound)?;
        drive.status = status;
        Ok(())
    }
}

impl StudentStore for InMemoryPlacementStore {
    fn insert_student(&self, student: Student) -> Result<Student, RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        if state.students.contains_key(&student.id) {
            return Err(RepositoryError::Conflict);
        }
        state.students.insert(student.id.clone(), student.clone());
        Ok(student)
    }

    fn fetch_student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.students.get(id).cloned())
    }

    fn update_student(&self, student: Student) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        if !state.students.contains_key(&student.id) {
            return Err(RepositoryError::NotFound);
        }
        state.students.insert(student.id.clone(), student);
        Ok(())
    }

    fn students_pending_approval(&self) -> Result<Vec<Student>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        let mut pending: Vec<Student> = state
            .students
            .values()
            .filter(|student| student.profile_status == ProfileStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(pending)
    }
}

impl ApplicationStore for InMemoryPlacementStore {
    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let pair = (application.drive_id.clone(), application.student_id.clone());
        if state.active_pairs.contains(&pair) {
            return Err(RepositoryError::Conflict);
        }
        state.active_pairs.insert(pair);
        state
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.applications.get(id).cloned())
    }

    fn update_application(
        &self,
        application: Application,
        expected: ApplicationStatus,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let stored = state
            .applications
            .get(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::Conflict);
        }
        if application.status == ApplicationStatus::Withdrawn {
            let pair = (application.drive_id.clone(), application.student_id.clone());
            state.active_pairs.remove(&pair);
        }
        state
            .applications
            .insert(application.id.clone(), application);
        Ok(())
    }

    fn find_active_application(
        &self,
        drive_id: &DriveId,
        student_id: &StudentId,
    ) -> Result<Option<Application>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .applications
            .values()
            .find(|application| {
                application.drive_id == *drive_id
                    && application.student_id == *student_id
                    && application.status != ApplicationStatus::Withdrawn
            })
            .cloned())
    }

    fn applications_for_drive(
        &self,
        drive_id: &DriveId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .applications
            .values()
            .filter(|application| application.drive_id == *drive_id)
            .cloned()
            .collect())
    }
}

/// Dispatcher that logs each notification instead of talking to a mail
/// relay; the real SMTP adapter implements the same trait.
#[derive(Default)]
pub(crate) struct LoggingNotificationDispatcher {
    sent: Mutex<Vec<Notification>>,
}

impl NotificationDispatcher for LoggingNotificationDispatcher {
    fn dispatch(&self, notification: Notification) -> Result<DispatchReceipt, DispatchError> {
        let recipient = format!("{}@campus.edu", notification.student_id.0);
        info!(
            template = %notification.template,
            application_id = %notification.application_id.0,
            recipient = %recipient,
            "notification dispatched"
        );
        self.sent
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(notification);
        Ok(DispatchReceipt { recipient })
    }
}

/// Seed a handful of drives and students so the development server and the
/// CLI demo have something to act on.
pub(crate) fn seed_demo_data(store: &InMemoryPlacementStore) -> Result<(), RepositoryError> {
    let now = Utc::now();

    store.insert_drive(Drive {
        id: DriveId("drive-acme-sde".to_string()),
        company_id: "acme".to_string(),
        job_role: "Software Development Engineer".to_string(),
        package: "12 LPA".to_string(),
        job_type: "Full-time".to_string(),
        location: "Pune".to_string(),
        application_deadline: now + Duration::days(7),
        drive_date: now + Duration::days(14),
        status: DriveStatus::Active,
        criteria: EligibilityCriteria {
            min_cgpa: 7.0,
            allowed_departments: BTreeSet::from(["CS".to_string(), "IT".to_string()]),
            max_backlogs: 0,
            graduation_years: BTreeSet::from([2026]),
        },
    })?;

    store.insert_drive(Drive {
        id: DriveId("drive-globex-analyst".to_string()),
        company_id: "globex".to_string(),
        job_role: "Data Analyst".to_string(),
        package: "8.5 LPA".to_string(),
        job_type: "Full-time".to_string(),
        location: "Hyderabad".to_string(),
        application_deadline: now + Duration::days(3),
        drive_date: now + Duration::days(10),
        status: DriveStatus::Active,
        criteria: EligibilityCriteria {
            min_cgpa: 6.5,
            allowed_departments: BTreeSet::new(),
            max_backlogs: 2,
            graduation_years: BTreeSet::from([2026]),
        },
    })?;

    store.insert_student(Student {
        id: StudentId("stu-asha".to_string()),
        name: "Asha Rao".to_string(),
        email: "asha@campus.edu".to_string(),
        cgpa: Some(8.2),
        department: "CS".to_string(),
        backlogs: 0,
        graduation_year: 2026,
        profile_status: ProfileStatus::Approved,
        rejection_reason: None,
    })?;

    store.insert_student(Student {
        id: StudentId("stu-ravi".to_string()),
        name: "Ravi Kumar".to_string(),
        email: "ravi@campus.edu".to_string(),
        cgpa: Some(6.8),
        department: "ME".to_string(),
        backlogs: 1,
        graduation_year: 2026,
        profile_status: ProfileStatus::Approved,
        rejection_reason: None,
    })?;

    store.insert_student(Student {
        id: StudentId("stu-meera".to_string()),
        name: "Meera Iyer".to_string(),
        email: "meera@campus.edu".to_string(),
        cgpa: Some(9.1),
        department: "IT".to_string(),
        backlogs: 0,
        graduation_year: 2026,
        profile_status: ProfileStatus::Pending,
        rejection_reason: None,
    })?;

    Ok(())
}
