use super::*;

/// Development environment: smaller address blocks in 172.16/12
pub fn dev_config() -> Config {
    Config {
        project: ProjectConfig {
            name: "vyos-sample-dev".to_string(),
        },
        aws: AwsConfig {
            account: "123456789012".to_string(),
            regions: Regions {
                tokyo: "ap-northeast-1".to_string(),
                osaka: "ap-northeast-3".to_string(),
            },
        },
        ec2: Ec2Config {
            // VyOS 1.4.3
            vyos_ami_id: "ami-05a998030d78b5358".to_string(),
            vyos_instance_type: "t3.medium".to_string(),
            // Amazon Linux 2023, ap-northeast-1
            test_instance_ami_id: "ami-0bc8f29a8fc3184aa".to_string(),
            test_instance_type: "t3.micro".to_string(),
            // Amazon Linux 2023, ap-northeast-3
            on_prem_test_ami_id: "ami-0facc8a2f7b924479".to_string(),
            on_prem_test_instance_type: "t3.micro".to_string(),
        },
        network: NetworkConfig {
            tokyo: TokyoNetwork {
                vpc1: VpcConfig {
                    cidr: "172.16.0.0/16".to_string(),
                },
                vpc2: VpcConfig {
                    cidr: "172.17.0.0/16".to_string(),
                },
            },
            osaka: OsakaNetwork {
                vpc: VpcConfig {
                    cidr: "172.20.0.0/16".to_string(),
                },
            },
        },
        transit_gateway: TransitGatewayConfig { asn: 64513 },
    }
}
