use super::*;

pub fn prod_config() -> Config {
    Config {
        project: ProjectConfig {
            name: "vyos-sample".to_string(),
        },
        aws: AwsConfig {
            account: "123456789012".to_string(),
            regions: Regions {
                tokyo: "ap-northeast-1".to_string(),
                osaka: "ap-northeast-3".to_string(),
            },
        },
        ec2: Ec2Config {
            vyos_ami_id: "ami-05a998030d78b5358".to_string(),
            vyos_instance_type: "t3.small".to_string(),
            test_instance_ami_id: "ami-0bc8f29a8fc3184aa".to_string(),
            test_instance_type: "t3.micro".to_string(),
            on_prem_test_ami_id: "ami-0facc8a2f7b924479".to_string(),
            on_prem_test_instance_type: "t3.micro".to_string(),
        },
        network: NetworkConfig {
            tokyo: TokyoNetwork {
                vpc1: VpcConfig {
                    cidr: "10.0.0.0/16".to_string(),
                },
                vpc2: VpcConfig {
                    cidr: "10.1.0.0/16".to_string(),
                },
            },
            osaka: OsakaNetwork {
                vpc: VpcConfig {
                    cidr: "192.168.0.0/16".to_string(),
                },
            },
        },
        transit_gateway: TransitGatewayConfig { asn: 64512 },
    }
}
