use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::placements::domain::{
    Actor, ActorRole, Application, ApplicationId, ApplicationStatus, Drive, DriveId, DriveStatus,
    EligibilityCriteria, ProfileStatus, Student, StudentId,
};
use crate::placements::repository::{
    ApplicationStore, DispatchError, DispatchReceipt, DriveStore, Notification,
    NotificationDispatcher, RepositoryError, StudentStore,
};
use crate::placements::{placement_router, PlacementEngine};

pub(super) fn now() -> DateTime<Utc> {
    Utc::now()
}

pub(super) fn criteria() -> EligibilityCriteria {
    EligibilityCriteria {
        min_cgpa: 7.0,
        allowed_departments: BTreeSet::from(["CS".to_string()]),
        max_backlogs: 0,
        graduation_years: BTreeSet::new(),
    }
}

pub(super) fn open_drive(id: &str) -> Drive {
    Drive {
        id: DriveId(id.to_string()),
        company_id: "acme".to_string(),
        job_role: "Backend Engineer".to_string(),
        package: "12 LPA".to_string(),
        job_type: "Full-time".to_string(),
        location: "Pune".to_string(),
        application_deadline: now() + Duration::days(7),
        drive_date: now() + Duration::days(14),
        status: DriveStatus::Active,
        criteria: criteria(),
    }
}

pub(super) fn expired_drive(id: &str) -> Drive {
    let mut drive = open_drive(id);
    drive.application_deadline = now() - Duration::days(1);
    drive
}

pub(super) fn approved_student(id: &str) -> Student {
    Student {
        id: StudentId(id.to_string()),
        name: "Asha Rao".to_string(),
        email: format!("{id}@campus.edu"),
        cgpa: Some(8.2),
        department: "CS".to_string(),
        backlogs: 0,
        graduation_year: 2026,
        profile_status: ProfileStatus::Approved,
        rejection_reason: None,
    }
}

pub(super) fn pending_student(id: &str) -> Student {
    let mut student = approved_student(id);
    student.profile_status = ProfileStatus::Pending;
    student
}

pub(super) fn tpo() -> Actor {
    Actor {
        role: ActorRole::Tpo,
        id: "tpo-1".to_string(),
    }
}

pub(super) fn hod() -> Actor {
    Actor {
        role: ActorRole::Hod,
        id: "hod-cs".to_string(),
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    drives: HashMap<DriveId, Drive>,
    students: HashMap<StudentId, Student>,
    applications: HashMap<ApplicationId, Application>,
    active_pairs: HashSet<(DriveId, StudentId)>,
}

impl DriveStore for MemoryStore {
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

impl StudentStore for MemoryStore {
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

impl ApplicationStore for MemoryStore {
    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        // Pair check and insert happen under one lock, the in-memory stand-in
        // for a filtered unique index.
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

#[derive(Default)]
pub(super) struct MemoryDispatcher {
    events: Mutex<Vec<Notification>>,
}

impl MemoryDispatcher {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("dispatcher mutex poisoned").clone()
    }
}

impl NotificationDispatcher for MemoryDispatcher {
    fn dispatch(&self, notification: Notification) -> Result<DispatchReceipt, DispatchError> {
        let recipient = format!("{}@campus.edu", notification.student_id.0);
        self.events
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(notification);
        Ok(DispatchReceipt { recipient })
    }
}

pub(super) struct FailingDispatcher;

impl NotificationDispatcher for FailingDispatcher {
    fn dispatch(&self, _notification: Notification) -> Result<DispatchReceipt, DispatchError> {
        Err(DispatchError::Transport("smtp offline".to_string()))
    }
}

pub(super) struct UnavailableStore;

impl DriveStore for UnavailableStore {
    fn insert_drive(&self, _drive: Drive) -> Result<Drive, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_drive(&self, _id: &DriveId) -> Result<Option<Drive>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_drives(&self) -> Result<Vec<Drive>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_drive_status(
        &self,
        _id: &DriveId,
        _status: DriveStatus,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl StudentStore for UnavailableStore {
    fn insert_student(&self, _student: Student) -> Result<Student, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_student(&self, _id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_student(&self, _student: Student) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn students_pending_approval(&self) -> Result<Vec<Student>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl ApplicationStore for UnavailableStore {
    fn insert_application(
        &self,
        _application: Application,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_application(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_application(
        &self,
        _application: Application,
        _expected: ApplicationStatus,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_active_application(
        &self,
        _drive_id: &DriveId,
        _student_id: &StudentId,
    ) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn applications_for_drive(
        &self,
        _drive_id: &DriveId,
    ) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Store simulating a lost compare-and-swap: reads hand back an applied
/// application, but every write reports that another writer committed first.
pub(super) struct ContendedStore;

impl DriveStore for ContendedStore {
    fn insert_drive(&self, _drive: Drive) -> Result<Drive, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn fetch_drive(&self, _id: &DriveId) -> Result<Option<Drive>, RepositoryError> {
        Ok(None)
    }

    fn list_drives(&self) -> Result<Vec<Drive>, RepositoryError> {
        Ok(Vec::new())
    }

    fn update_drive_status(
        &self,
        _id: &DriveId,
        _status: DriveStatus,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Conflict)
    }
}

impl StudentStore for ContendedStore {
    fn insert_student(&self, _student: Student) -> Result<Student, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn fetch_student(&self, _id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        Ok(None)
    }

    fn update_student(&self, _student: Student) -> Result<(), RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn students_pending_approval(&self) -> Result<Vec<Student>, RepositoryError> {
        Ok(Vec::new())
    }
}

impl ApplicationStore for ContendedStore {
    fn insert_application(
        &self,
        _application: Application,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(Some(Application {
            id: id.clone(),
            drive_id: DriveId("drive-1".to_string()),
            student_id: StudentId("stu-1".to_string()),
            status: ApplicationStatus::Applied,
            current_round: None,
            applied_at: now(),
            status_history: Vec::new(),
        }))
    }

    fn update_application(
        &self,
        _application: Application,
        _expected: ApplicationStatus,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn find_active_application(
        &self,
        _drive_id: &DriveId,
        _student_id: &StudentId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(None)
    }

    fn applications_for_drive(
        &self,
        _drive_id: &DriveId,
    ) -> Result<Vec<Application>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) fn build_engine() -> (
    Arc<PlacementEngine<MemoryStore, MemoryDispatcher>>,
    Arc<MemoryStore>,
    Arc<MemoryDispatcher>,
) {
    let store = Arc::new(MemoryStore::default());
    let dispatcher = Arc::new(MemoryDispatcher::default());
    let engine = Arc::new(PlacementEngine::new(store.clone(), dispatcher.clone()));
    (engine, store, dispatcher)
}

pub(super) fn seeded_engine() -> (
    Arc<PlacementEngine<MemoryStore, MemoryDispatcher>>,
    Arc<MemoryStore>,
    Arc<MemoryDispatcher>,
) {
    let (engine, store, dispatcher) = build_engine();
    store.insert_drive(open_drive("drive-1")).expect("drive seeds");
    store
        .insert_student(approved_student("stu-1"))
        .expect("student seeds");
    (engine, store, dispatcher)
}

pub(super) fn router_with_engine(
    engine: Arc<PlacementEngine<MemoryStore, MemoryDispatcher>>,
) -> axum::Router {
    placement_router(engine)
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
