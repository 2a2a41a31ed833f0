use tf_cluster_launcher::domain::cluster::host_list::HostList;
use tf_cluster_launcher::domain::cluster::topology::{ClusterTopology, Task, TaskType, TfConfig, build_tf_config};
use tf_cluster_launcher::domain::utils::id::HostId;
use tf_cluster_launcher::error::Error;

const HOST1: &str = "host1";
const HOST2: &str = "host2";

fn host_list(names: &[&str]) -> HostList {
    HostList::try_from(names.iter().map(|n| n.to_string()).collect::<Vec<_>>()).expect("valid host list")
}

fn cluster_with_ps() -> ClusterTopology {
    ClusterTopology {
        master: vec![format!("{}:2222", HOST1)],
        ps: Some(vec![format!("{}:2223", HOST1), format!("{}:2223", HOST2)]),
        worker: vec![format!("{}:2222", HOST2)],
    }
}

fn expected(task_type: TaskType, index: usize) -> TfConfig {
    TfConfig { cluster: cluster_with_ps(), environment: "cloud".to_string(), task: Task { index, task_type } }
}

#[test]
fn test_build_tf_config_two_hosts() {
    let hosts = host_list(&[HOST1, HOST2]);

    assert_eq!(build_tf_config(&hosts, &HostId::new(HOST1), false).unwrap(), expected(TaskType::Master, 0));
    assert_eq!(build_tf_config(&hosts, &HostId::new(HOST1), true).unwrap(), expected(TaskType::ParameterServer, 0));
    assert_eq!(build_tf_config(&hosts, &HostId::new(HOST2), false).unwrap(), expected(TaskType::Worker, 0));
    assert_eq!(build_tf_config(&hosts, &HostId::new(HOST2), true).unwrap(), expected(TaskType::ParameterServer, 1));
}

#[test]
fn test_build_tf_config_error_on_single_host_ps() {
    let hosts = host_list(&[HOST1]);

    let err = build_tf_config(&hosts, &HostId::new(HOST1), true).unwrap_err();

    assert!(matches!(err, Error::InvalidTopology(_)));
    assert!(err.to_string().contains("Cannot have a ps task if there are no parameter servers in the cluster"));
}

#[test]
fn test_master_iff_first_host() {
    let names: Vec<String> = (0..6).map(|i| format!("algo-{}", i + 1)).collect();
    let hosts = HostList::try_from(names.clone()).unwrap();

    for (position, name) in names.iter().enumerate() {
        let task = build_tf_config(&hosts, &HostId::new(name.as_str()), false).unwrap().task;
        if position == 0 {
            assert_eq!(task, Task { index: 0, task_type: TaskType::Master });
        } else {
            assert_eq!(task, Task { index: position - 1, task_type: TaskType::Worker });
        }
    }
}

#[test]
fn test_ps_tier_covers_every_host_in_order() {
    let names: Vec<String> = ["c", "a", "b", "e", "d"].iter().map(|s| s.to_string()).collect();
    let hosts = HostList::try_from(names.clone()).unwrap();

    for (position, name) in names.iter().enumerate() {
        let config = build_tf_config(&hosts, &HostId::new(name.as_str()), true).unwrap();
        let ps = config.cluster.ps.expect("ps tier present");

        assert_eq!(ps.len(), names.len());
        assert_eq!(ps, names.iter().map(|n| format!("{}:2223", n)).collect::<Vec<_>>());
        assert_eq!(config.task, Task { index: position, task_type: TaskType::ParameterServer });
    }
}

#[test]
fn test_serialization_is_deterministic() {
    let hosts = host_list(&[HOST1, HOST2, "host3"]);
    let current = HostId::new("host3");

    let first = build_tf_config(&hosts, &current, false).unwrap().to_json().unwrap();
    let second = build_tf_config(&hosts, &current, false).unwrap().to_json().unwrap();

    assert_eq!(first.as_bytes(), second.as_bytes());
    assert!(!first.contains(' '), "descriptor should be compact: {}", first);
}

#[test]
fn test_descriptor_round_trips_for_launched_process() {
    let hosts = host_list(&[HOST1, HOST2]);
    let config = build_tf_config(&hosts, &HostId::new(HOST2), false).unwrap();

    let parsed: TfConfig = serde_json::from_str(&config.to_json().unwrap()).unwrap();
    assert_eq!(parsed, config);
}
