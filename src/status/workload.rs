//! Replica readiness for workload controllers

use super::{ObjectStatus, Property, Severity};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};

/// Status from desired and ready replica counts
fn replica_status(ready: i32, desired: i32, available: Option<i32>) -> ObjectStatus {
    let mut status = ObjectStatus::ok();
    status.properties.push(Property::new(
        "Replicas",
        format!("{}/{}", ready, desired),
    ));

    if ready < desired || available.is_some_and(|available| available < desired) {
        status.severity = Severity::Warning;
        status
            .details
            .push(format!("{} of {} replicas ready", ready, desired));
    }
    status
}

pub fn deployment(deployment: &Deployment) -> ObjectStatus {
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let ready = deployment
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or(0);
    let available = deployment
        .status
        .as_ref()
        .and_then(|s| s.available_replicas)
        .unwrap_or(0);

    let mut status = replica_status(ready, desired, Some(available));
    let progress_failed = deployment
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .into_iter()
        .flatten()
        .find(|c| c.type_ == "Progressing" && c.status == "False");
    if let Some(condition) = progress_failed {
        status.severity = Severity::Error;
        status.details.push(
            condition
                .message
                .clone()
                .unwrap_or_else(|| "Deployment is not progressing".to_string()),
        );
    }
    status
}

pub fn replica_set(replica_set: &ReplicaSet) -> ObjectStatus {
    let desired = replica_set
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let ready = replica_set
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or(0);
    replica_status(ready, desired, None)
}

pub fn stateful_set(stateful_set: &StatefulSet) -> ObjectStatus {
    let desired = stateful_set
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let ready = stateful_set
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or(0);
    replica_status(ready, desired, None)
}

pub fn daemon_set(daemon_set: &DaemonSet) -> ObjectStatus {
    let desired = daemon_set
        .status
        .as_ref()
        .map(|s| s.desired_number_scheduled)
        .unwrap_or(0);
    let ready = daemon_set
        .status
        .as_ref()
        .map(|s| s.number_ready)
        .unwrap_or(0);

    let mut status = ObjectStatus::ok();
    status
        .properties
        .push(Property::new("Ready", format!("{}/{}", ready, desired)));
    if desired == 0 {
        status.severity = Severity::Warning;
        status.details.push("No nodes scheduled".to_string());
    } else if ready < desired {
        status.severity = Severity::Warning;
        status
            .details
            .push(format!("{} of {} pods ready", ready, desired));
    }
    status
}

pub fn job(job: &Job) -> ObjectStatus {
    let succeeded = job.status.as_ref().and_then(|s| s.succeeded).unwrap_or(0);
    let failed = job.status.as_ref().and_then(|s| s.failed).unwrap_or(0);

    let mut status = ObjectStatus::ok();
    status
        .properties
        .push(Property::new("Succeeded", succeeded.to_string()));
    if failed > 0 {
        status.severity = Severity::Error;
        status.properties.push(Property::new("Failed", failed.to_string()));
        status.details.push(format!("{} pods failed", failed));
    }
    status
}

pub fn cron_job(cron_job: &CronJob) -> ObjectStatus {
    let active = cron_job
        .status
        .as_ref()
        .and_then(|s| s.active.as_ref())
        .map(|a| a.len())
        .unwrap_or(0);

    let mut status = ObjectStatus::ok();
    status
        .properties
        .push(Property::new("Active", active.to_string()));
    if cron_job
        .spec
        .as_ref()
        .and_then(|s| s.suspend)
        .unwrap_or(false)
    {
        status.severity = Severity::Warning;
        status.details.push("CronJob is suspended".to_string());
    }
    status
}
